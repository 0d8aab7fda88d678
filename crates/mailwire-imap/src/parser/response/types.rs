//! Response data types.

use crate::types::{
    Acl, Capability, Flags, ListResponse, ListRights, Mailbox, MailboxStatus, MyRights,
    Namespaces, Quota, QuotaRoot, ResponseCode, SeqNum, Status, Uid,
};

/// FETCH response item.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Flags),
    /// Internal date, unparsed.
    InternalDate(String),
    /// RFC822 size.
    Rfc822Size(u32),
    /// Envelope.
    Envelope(Box<Envelope>),
    /// UID.
    Uid(Uid),
    /// `BODY[section]<origin>` or an RFC822 data item.
    Body {
        /// Section specifier.
        section: Option<String>,
        /// Origin offset for partial fetches.
        origin: Option<u32>,
        /// Body data; `None` when the server sent NIL.
        data: Option<Vec<u8>>,
    },
    /// BODYSTRUCTURE.
    BodyStructure(BodyStructure),
    /// MODSEQ (CONDSTORE).
    ModSeq(u64),
}

/// Message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// Address from an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route (obsolete).
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain part.
    pub host: Option<String>,
}

impl Address {
    /// Returns `local@domain` when both parts are present.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// Body structure, reduced to the fields callers use.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyStructure {
    /// Single non-text part.
    Basic {
        /// MIME type.
        media_type: String,
        /// MIME subtype.
        media_subtype: String,
        /// Body parameters.
        params: Vec<(String, String)>,
        /// Content-ID.
        id: Option<String>,
        /// Content-Description.
        description: Option<String>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Size in octets.
        size: u32,
    },
    /// Single text part.
    Text {
        /// Text subtype.
        subtype: String,
        /// Body parameters.
        params: Vec<(String, String)>,
        /// Content-ID.
        id: Option<String>,
        /// Content-Description.
        description: Option<String>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Size in octets.
        size: u32,
        /// Size in lines.
        lines: u32,
    },
    /// Multipart body.
    Multipart {
        /// Child parts.
        bodies: Vec<Self>,
        /// Multipart subtype.
        subtype: String,
    },
}

/// Decoded untagged (`*`) response.
///
/// Matched exhaustively by the connection state; anything the decoder does
/// not recognize arrives as [`UntaggedResponse::Unknown`] instead of failing
/// the command.
#[derive(Debug, Clone, PartialEq)]
pub enum UntaggedResponse {
    /// `* OK`, `* NO`, `* BAD`, `* PREAUTH` or `* BYE`.
    Condition {
        /// Condition keyword.
        status: Status,
        /// Optional bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// CAPABILITY data.
    Capability(Vec<Capability>),
    /// ENABLED data (RFC 5161).
    Enabled(Vec<Capability>),
    /// LIST data.
    List(ListResponse),
    /// LSUB data.
    LSub(ListResponse),
    /// STATUS data.
    Status {
        /// Mailbox the counters describe.
        mailbox: Mailbox,
        /// Counters the server returned.
        status: MailboxStatus,
    },
    /// SEARCH data: sequence numbers or UIDs depending on the command.
    Search(Vec<u32>),
    /// FLAGS data.
    Flags(Flags),
    /// `<n> EXISTS`.
    Exists(u32),
    /// `<n> RECENT`.
    Recent(u32),
    /// `<n> EXPUNGE`.
    Expunge(SeqNum),
    /// `<n> FETCH (...)`.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Data items.
        items: Vec<FetchItem>,
    },
    /// ACL data.
    Acl(Acl),
    /// LISTRIGHTS data.
    ListRights(ListRights),
    /// MYRIGHTS data.
    MyRights(MyRights),
    /// QUOTA data.
    Quota(Quota),
    /// QUOTAROOT data.
    QuotaRoot(QuotaRoot),
    /// NAMESPACE data.
    Namespace(Namespaces),
    /// Any response this decoder does not understand.
    Unknown {
        /// First keyword after `*` (or after the number).
        keyword: String,
        /// The whole line after `* `, CRLF stripped.
        raw: String,
    },
}

impl UntaggedResponse {
    /// Returns true for `* BYE`.
    #[must_use]
    pub const fn is_bye(&self) -> bool {
        matches!(
            self,
            Self::Condition {
                status: Status::Bye,
                ..
            }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn address_email_needs_both_parts() {
        let mut addr = Address {
            name: Some("Bob".to_string()),
            adl: None,
            mailbox: Some("bob".to_string()),
            host: Some("example.org".to_string()),
        };
        assert_eq!(addr.email(), Some("bob@example.org".to_string()));
        addr.host = None;
        assert_eq!(addr.email(), None);
    }

    #[test]
    fn bye_detection() {
        let bye = UntaggedResponse::Condition {
            status: Status::Bye,
            code: None,
            text: "shutting down".to_string(),
        };
        assert!(bye.is_bye());
        assert!(!UntaggedResponse::Exists(1).is_bye());
    }
}
