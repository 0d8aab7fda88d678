//! Argument types for commands.

use crate::types::{Flag, SequenceSet, UidSet};

use super::builder::CommandBuilder;

/// STATUS data item to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAttribute {
    /// Number of messages.
    Messages,
    /// Number of recent messages.
    Recent,
    /// Next UID.
    UidNext,
    /// UIDVALIDITY.
    UidValidity,
    /// Number of unseen messages.
    Unseen,
}

impl StatusAttribute {
    /// Every attribute RFC 3501 defines.
    pub const ALL: [Self; 5] = [
        Self::Messages,
        Self::Recent,
        Self::UidNext,
        Self::UidValidity,
        Self::Unseen,
    ];

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
        }
    }
}

/// What FETCH should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// `ALL` macro.
    All,
    /// `FULL` macro.
    Full,
    /// `FAST` macro.
    Fast,
    /// Explicit attribute list.
    Items(Vec<FetchAttribute>),
}

impl FetchItems {
    pub(crate) fn encode(&self) -> String {
        match self {
            Self::All => "ALL".to_string(),
            Self::Full => "FULL".to_string(),
            Self::Fast => "FAST".to_string(),
            Self::Items(attrs) if attrs.len() == 1 => attrs[0].encode(),
            Self::Items(attrs) => {
                let inner: Vec<String> = attrs.iter().map(FetchAttribute::encode).collect();
                format!("({})", inner.join(" "))
            }
        }
    }
}

/// One FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// FLAGS.
    Flags,
    /// INTERNALDATE.
    InternalDate,
    /// RFC822.SIZE.
    Rfc822Size,
    /// ENVELOPE.
    Envelope,
    /// BODYSTRUCTURE.
    BodyStructure,
    /// UID.
    Uid,
    /// `BODY[section]<start.len>` or `BODY.PEEK[...]`.
    Body {
        /// Section specifier, e.g. `HEADER` or `1.2`.
        section: Option<String>,
        /// Use BODY.PEEK so `\Seen` is not set.
        peek: bool,
        /// Partial range `(start, length)`.
        partial: Option<(u32, u32)>,
    },
    /// RFC822.
    Rfc822,
    /// RFC822.HEADER.
    Rfc822Header,
    /// RFC822.TEXT.
    Rfc822Text,
}

impl FetchAttribute {
    fn encode(&self) -> String {
        match self {
            Self::Flags => "FLAGS".to_string(),
            Self::InternalDate => "INTERNALDATE".to_string(),
            Self::Rfc822Size => "RFC822.SIZE".to_string(),
            Self::Envelope => "ENVELOPE".to_string(),
            Self::BodyStructure => "BODYSTRUCTURE".to_string(),
            Self::Uid => "UID".to_string(),
            Self::Rfc822 => "RFC822".to_string(),
            Self::Rfc822Header => "RFC822.HEADER".to_string(),
            Self::Rfc822Text => "RFC822.TEXT".to_string(),
            Self::Body {
                section,
                peek,
                partial,
            } => {
                let name = if *peek { "BODY.PEEK" } else { "BODY" };
                let mut out = format!("{name}[{}]", section.as_deref().unwrap_or_default());
                if let Some((start, len)) = partial {
                    out.push_str(&format!("<{start}.{len}>"));
                }
                out
            }
        }
    }
}

/// Flag change requested by STORE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Replace flags (`FLAGS`).
    SetFlags(Vec<Flag>),
    /// Add flags (`+FLAGS`).
    AddFlags(Vec<Flag>),
    /// Remove flags (`-FLAGS`).
    RemoveFlags(Vec<Flag>),
}

impl StoreAction {
    pub(crate) fn encode(&self, silent: bool) -> String {
        let (item, flags) = match self {
            Self::SetFlags(f) => ("FLAGS", f),
            Self::AddFlags(f) => ("+FLAGS", f),
            Self::RemoveFlags(f) => ("-FLAGS", f),
        };
        let suffix = if silent { ".SILENT" } else { "" };
        format!("{item}{suffix} {}", flag_list(flags))
    }
}

/// Formats flags as a parenthesized list.
pub(crate) fn flag_list(flags: &[Flag]) -> String {
    let names: Vec<&str> = flags.iter().map(Flag::as_str).collect();
    format!("({})", names.join(" "))
}

/// SEARCH key. A `Vec` of keys in [`SearchCriteria::And`] is an implicit AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// ALL.
    All,
    /// ANSWERED.
    Answered,
    /// UNANSWERED.
    Unanswered,
    /// DELETED.
    Deleted,
    /// UNDELETED.
    Undeleted,
    /// DRAFT.
    Draft,
    /// FLAGGED.
    Flagged,
    /// UNFLAGGED.
    Unflagged,
    /// NEW.
    New,
    /// OLD.
    Old,
    /// RECENT.
    Recent,
    /// SEEN.
    Seen,
    /// UNSEEN.
    Unseen,
    /// KEYWORD.
    Keyword(String),
    /// UNKEYWORD.
    Unkeyword(String),
    /// Messages in a sequence set.
    SequenceSet(SequenceSet),
    /// UID set.
    UidSet(UidSet),
    /// SUBJECT contains.
    Subject(String),
    /// FROM contains.
    From(String),
    /// TO contains.
    To(String),
    /// CC contains.
    Cc(String),
    /// BCC contains.
    Bcc(String),
    /// Body contains.
    Body(String),
    /// Header or body contains.
    Text(String),
    /// Internal date on or after, `d-Mon-yyyy`.
    Since(String),
    /// Internal date before.
    Before(String),
    /// Internal date on.
    On(String),
    /// Larger than n octets.
    Larger(u32),
    /// Smaller than n octets.
    Smaller(u32),
    /// Named header contains value.
    Header(String, String),
    /// All keys match.
    And(Vec<Self>),
    /// Either key matches.
    Or(Box<Self>, Box<Self>),
    /// Key does not match.
    Not(Box<Self>),
}

impl SearchCriteria {
    /// Encodes the key. String arguments go through the astring rules, so
    /// 8-bit values become literals.
    pub(crate) fn encode(&self, b: &mut CommandBuilder) {
        match self {
            Self::All => b.atom("ALL"),
            Self::Answered => b.atom("ANSWERED"),
            Self::Unanswered => b.atom("UNANSWERED"),
            Self::Deleted => b.atom("DELETED"),
            Self::Undeleted => b.atom("UNDELETED"),
            Self::Draft => b.atom("DRAFT"),
            Self::Flagged => b.atom("FLAGGED"),
            Self::Unflagged => b.atom("UNFLAGGED"),
            Self::New => b.atom("NEW"),
            Self::Old => b.atom("OLD"),
            Self::Recent => b.atom("RECENT"),
            Self::Seen => b.atom("SEEN"),
            Self::Unseen => b.atom("UNSEEN"),
            Self::Keyword(k) => b.atom("KEYWORD").atom(k),
            Self::Unkeyword(k) => b.atom("UNKEYWORD").atom(k),
            Self::SequenceSet(set) => b.atom(&set.to_string()),
            Self::UidSet(set) => b.atom("UID").atom(&set.to_string()),
            Self::Subject(s) => b.atom("SUBJECT").astring(s),
            Self::From(s) => b.atom("FROM").astring(s),
            Self::To(s) => b.atom("TO").astring(s),
            Self::Cc(s) => b.atom("CC").astring(s),
            Self::Bcc(s) => b.atom("BCC").astring(s),
            Self::Body(s) => b.atom("BODY").astring(s),
            Self::Text(s) => b.atom("TEXT").astring(s),
            Self::Since(d) => b.atom("SINCE").atom(d),
            Self::Before(d) => b.atom("BEFORE").atom(d),
            Self::On(d) => b.atom("ON").atom(d),
            Self::Larger(n) => b.atom("LARGER").atom(&n.to_string()),
            Self::Smaller(n) => b.atom("SMALLER").atom(&n.to_string()),
            Self::Header(name, value) => b.atom("HEADER").astring(name).astring(value),
            Self::And(keys) => {
                for key in keys {
                    key.encode(b);
                }
                b
            }
            Self::Or(x, y) => {
                b.atom("OR");
                x.encode(b);
                y.encode(b);
                b
            }
            Self::Not(key) => {
                b.atom("NOT");
                key.encode(b);
                b
            }
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Tag;

    #[test]
    fn fetch_items_encoding() {
        assert_eq!(FetchItems::Fast.encode(), "FAST");
        assert_eq!(FetchItems::Items(vec![FetchAttribute::Uid]).encode(), "UID");
        let items = FetchItems::Items(vec![
            FetchAttribute::Flags,
            FetchAttribute::Body {
                section: Some("HEADER".to_string()),
                peek: true,
                partial: Some((0, 1024)),
            },
        ]);
        assert_eq!(items.encode(), "(FLAGS BODY.PEEK[HEADER]<0.1024>)");
    }

    #[test]
    fn store_action_encoding() {
        let action = StoreAction::AddFlags(vec![Flag::Deleted]);
        assert_eq!(action.encode(true), "+FLAGS.SILENT (\\Deleted)");
        let action = StoreAction::SetFlags(vec![Flag::Seen, Flag::Flagged]);
        assert_eq!(action.encode(false), "FLAGS (\\Seen \\Flagged)");
    }

    #[test]
    fn nested_search_keys() {
        let criteria = SearchCriteria::And(vec![
            SearchCriteria::Unseen,
            SearchCriteria::Or(
                Box::new(SearchCriteria::From("alice".to_string())),
                Box::new(SearchCriteria::Not(Box::new(SearchCriteria::Larger(1000)))),
            ),
        ]);
        let mut b = CommandBuilder::new(&Tag::new("00001"), "SEARCH");
        criteria.encode(&mut b);
        assert_eq!(
            b.finish().to_bytes(),
            b"00001 SEARCH UNSEEN OR FROM alice NOT LARGER 1000\r\n"
        );
    }
}
