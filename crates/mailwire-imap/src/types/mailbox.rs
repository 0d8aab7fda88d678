//! Mailbox types.

use super::{Flags, SeqNum, Uid, UidValidity};

/// Mailbox name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a new mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The INBOX mailbox.
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this names INBOX, which is case-insensitive.
    #[must_use]
    pub fn is_inbox(&self) -> bool {
        self.0.eq_ignore_ascii_case("INBOX")
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Mailbox {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Mailbox {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// State of the currently selected folder.
///
/// Created when SELECT or EXAMINE starts, filled in as the server's
/// untagged data and response codes arrive, replaced wholesale by the next
/// SELECT and dropped by CLOSE, UNSELECT, LOGOUT, or a failed SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFolder {
    /// Folder name as given to SELECT/EXAMINE.
    pub name: Mailbox,
    /// Whether the folder is read-only (EXAMINE or `[READ-ONLY]`).
    pub read_only: bool,
    /// Number of messages (`EXISTS`). EXPUNGE does not decrement it.
    pub exists: u32,
    /// Number of recent messages (`RECENT`).
    pub recent: u32,
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
    /// First unseen message sequence number.
    pub first_unseen: Option<SeqNum>,
    /// Flags the client can change permanently.
    pub permanent_flags: Flags,
    /// Flags defined for this folder (`FLAGS`).
    pub flags: Flags,
}

impl SelectedFolder {
    /// Creates an empty folder state for a SELECT/EXAMINE in progress.
    #[must_use]
    pub fn new(name: impl Into<Mailbox>, read_only: bool) -> Self {
        Self {
            name: name.into(),
            read_only,
            exists: 0,
            recent: 0,
            uid_validity: None,
            uid_next: None,
            first_unseen: None,
            permanent_flags: Flags::new(),
            flags: Flags::new(),
        }
    }
}

/// LIST or LSUB response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Mailbox attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter.
    pub delimiter: Option<char>,
    /// Mailbox name.
    pub mailbox: Mailbox,
}

impl ListResponse {
    /// Returns true if the mailbox cannot be selected.
    #[must_use]
    pub fn is_noselect(&self) -> bool {
        self.attributes.contains(&MailboxAttribute::NoSelect)
    }
}

/// Mailbox attributes from LIST response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// Mailbox cannot be selected.
    NoSelect,
    /// Mailbox cannot have children.
    NoInferiors,
    /// Mailbox has no children.
    HasNoChildren,
    /// Mailbox has children.
    HasChildren,
    /// Mailbox is marked for attention.
    Marked,
    /// Mailbox is not marked.
    Unmarked,
    /// Unknown attribute.
    Unknown(String),
}

impl MailboxAttribute {
    /// Parses a mailbox attribute string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "\\NOSELECT" => Self::NoSelect,
            "\\NOINFERIORS" => Self::NoInferiors,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\MARKED" => Self::Marked,
            "\\UNMARKED" => Self::Unmarked,
            _ => Self::Unknown(s.to_string()),
        }
    }
}

/// Mailbox status returned by the STATUS command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages.
    pub messages: Option<u32>,
    /// Number of recent messages.
    pub recent: Option<u32>,
    /// Next UID.
    pub uid_next: Option<u32>,
    /// UIDVALIDITY.
    pub uid_validity: Option<u32>,
    /// Number of unseen messages.
    pub unseen: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn inbox_is_case_insensitive() {
        assert!(Mailbox::new("inbox").is_inbox());
        assert!(Mailbox::inbox().is_inbox());
        assert!(!Mailbox::new("Sent").is_inbox());
    }

    #[test]
    fn new_selected_folder_is_empty() {
        let folder = SelectedFolder::new("INBOX", true);
        assert_eq!(folder.name.as_str(), "INBOX");
        assert!(folder.read_only);
        assert_eq!(folder.exists, 0);
        assert!(folder.flags.is_empty());
        assert!(folder.uid_validity.is_none());
    }

    #[test]
    fn attribute_parse() {
        assert_eq!(
            MailboxAttribute::parse("\\Noselect"),
            MailboxAttribute::NoSelect
        );
        assert_eq!(
            MailboxAttribute::parse("\\HasChildren"),
            MailboxAttribute::HasChildren
        );
        assert_eq!(
            MailboxAttribute::parse("\\Archive"),
            MailboxAttribute::Unknown("\\Archive".to_string())
        );
    }

    #[test]
    fn list_response_noselect() {
        let entry = ListResponse {
            attributes: vec![MailboxAttribute::NoSelect],
            delimiter: Some('/'),
            mailbox: Mailbox::new("Public"),
        };
        assert!(entry.is_noselect());
    }
}
