//! IMAP commands and their wire encoding.

mod builder;
mod tag_generator;
mod types;

use crate::types::{AclModifyMode, Flag, Mailbox, QuotaResourceName, Rights, SequenceSet, Tag, UidSet};

pub use builder::{CommandBuilder, REDACTED, Request};
pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, FetchItems, SearchCriteria, StatusAttribute, StoreAction};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any state
    /// CAPABILITY.
    Capability,
    /// NOOP.
    Noop,
    /// LOGOUT.
    Logout,

    // Not authenticated
    /// STARTTLS.
    StartTls,
    /// LOGIN.
    Login {
        /// User name.
        username: String,
        /// Password; masked in logs.
        password: String,
    },
    /// AUTHENTICATE.
    Authenticate {
        /// SASL mechanism name.
        mechanism: String,
        /// Base64 initial response (SASL-IR); `=` for an empty one.
        initial_response: Option<String>,
    },

    // Authenticated
    /// ENABLE (RFC 5161).
    Enable {
        /// Capabilities to enable.
        capabilities: Vec<String>,
    },
    /// SELECT.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// EXAMINE.
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// CREATE.
    Create {
        /// Mailbox to create.
        mailbox: Mailbox,
    },
    /// DELETE.
    Delete {
        /// Mailbox to delete.
        mailbox: Mailbox,
    },
    /// RENAME.
    Rename {
        /// Current name.
        from: Mailbox,
        /// New name.
        to: Mailbox,
    },
    /// SUBSCRIBE.
    Subscribe {
        /// Mailbox.
        mailbox: Mailbox,
    },
    /// UNSUBSCRIBE.
    Unsubscribe {
        /// Mailbox.
        mailbox: Mailbox,
    },
    /// LIST.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern with `*`/`%` wildcards.
        pattern: String,
    },
    /// LSUB.
    Lsub {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// NAMESPACE (RFC 2342).
    Namespace,
    /// STATUS.
    Status {
        /// Mailbox.
        mailbox: Mailbox,
        /// Items to request.
        items: Vec<StatusAttribute>,
    },
    /// APPEND with an in-memory message.
    Append {
        /// Target mailbox.
        mailbox: Mailbox,
        /// Initial flags.
        flags: Vec<Flag>,
        /// Internal date, `dd-Mon-yyyy hh:mm:ss +zzzz`.
        date: Option<String>,
        /// Message bytes, sent as a literal.
        message: Vec<u8>,
    },
    /// GETACL (RFC 4314).
    GetAcl {
        /// Mailbox.
        mailbox: Mailbox,
    },
    /// SETACL.
    SetAcl {
        /// Mailbox.
        mailbox: Mailbox,
        /// User or group.
        identifier: String,
        /// Replace, add or remove.
        mode: AclModifyMode,
        /// Rights to apply.
        rights: Rights,
    },
    /// DELETEACL.
    DeleteAcl {
        /// Mailbox.
        mailbox: Mailbox,
        /// User or group.
        identifier: String,
    },
    /// LISTRIGHTS.
    ListRights {
        /// Mailbox.
        mailbox: Mailbox,
        /// User or group.
        identifier: String,
    },
    /// MYRIGHTS.
    MyRights {
        /// Mailbox.
        mailbox: Mailbox,
    },
    /// GETQUOTA (RFC 2087).
    GetQuota {
        /// Quota root.
        root: String,
    },
    /// GETQUOTAROOT.
    GetQuotaRoot {
        /// Mailbox.
        mailbox: Mailbox,
    },
    /// SETQUOTA.
    SetQuota {
        /// Quota root.
        root: String,
        /// Resource limits; empty removes all limits.
        limits: Vec<(QuotaResourceName, u64)>,
    },

    // Selected
    /// CHECK.
    Check,
    /// CLOSE.
    Close,
    /// UNSELECT (RFC 3691).
    Unselect,
    /// EXPUNGE.
    Expunge,
    /// UID EXPUNGE (RFC 4315).
    UidExpunge {
        /// UIDs to expunge.
        uids: UidSet,
    },
    /// SEARCH / UID SEARCH.
    Search {
        /// Optional CHARSET, e.g. `UTF-8`.
        charset: Option<String>,
        /// Search keys.
        criteria: SearchCriteria,
        /// Return UIDs.
        uid: bool,
    },
    /// FETCH / UID FETCH.
    Fetch {
        /// Messages.
        sequence: SequenceSet,
        /// Data items.
        items: FetchItems,
        /// Interpret `sequence` as UIDs.
        uid: bool,
    },
    /// STORE / UID STORE.
    Store {
        /// Messages.
        sequence: SequenceSet,
        /// Flag change.
        action: StoreAction,
        /// Interpret `sequence` as UIDs.
        uid: bool,
        /// Suppress the untagged FETCH echo.
        silent: bool,
    },
    /// COPY / UID COPY.
    Copy {
        /// Messages.
        sequence: SequenceSet,
        /// Destination.
        mailbox: Mailbox,
        /// Interpret `sequence` as UIDs.
        uid: bool,
    },
    /// MOVE / UID MOVE (RFC 6851).
    Move {
        /// Messages.
        sequence: SequenceSet,
        /// Destination.
        mailbox: Mailbox,
        /// Interpret `sequence` as UIDs.
        uid: bool,
    },
    /// IDLE (RFC 2177).
    Idle,
}

impl Command {
    /// Returns the verb as sent on the wire.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Authenticate { .. } => "AUTHENTICATE",
            Self::Enable { .. } => "ENABLE",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::Create { .. } => "CREATE",
            Self::Delete { .. } => "DELETE",
            Self::Rename { .. } => "RENAME",
            Self::Subscribe { .. } => "SUBSCRIBE",
            Self::Unsubscribe { .. } => "UNSUBSCRIBE",
            Self::List { .. } => "LIST",
            Self::Lsub { .. } => "LSUB",
            Self::Namespace => "NAMESPACE",
            Self::Status { .. } => "STATUS",
            Self::Append { .. } => "APPEND",
            Self::GetAcl { .. } => "GETACL",
            Self::SetAcl { .. } => "SETACL",
            Self::DeleteAcl { .. } => "DELETEACL",
            Self::ListRights { .. } => "LISTRIGHTS",
            Self::MyRights { .. } => "MYRIGHTS",
            Self::GetQuota { .. } => "GETQUOTA",
            Self::GetQuotaRoot { .. } => "GETQUOTAROOT",
            Self::SetQuota { .. } => "SETQUOTA",
            Self::Check => "CHECK",
            Self::Close => "CLOSE",
            Self::Unselect => "UNSELECT",
            Self::Expunge => "EXPUNGE",
            Self::UidExpunge { .. } => "UID EXPUNGE",
            Self::Search { uid: false, .. } => "SEARCH",
            Self::Search { uid: true, .. } => "UID SEARCH",
            Self::Fetch { uid: false, .. } => "FETCH",
            Self::Fetch { uid: true, .. } => "UID FETCH",
            Self::Store { uid: false, .. } => "STORE",
            Self::Store { uid: true, .. } => "UID STORE",
            Self::Copy { uid: false, .. } => "COPY",
            Self::Copy { uid: true, .. } => "UID COPY",
            Self::Move { uid: false, .. } => "MOVE",
            Self::Move { uid: true, .. } => "UID MOVE",
            Self::Idle => "IDLE",
        }
    }

    /// Encodes the command under the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &Tag) -> Request {
        let mut b = CommandBuilder::new(tag, self.verb());

        match self {
            Self::Capability
            | Self::Noop
            | Self::Logout
            | Self::StartTls
            | Self::Namespace
            | Self::Check
            | Self::Close
            | Self::Unselect
            | Self::Expunge
            | Self::Idle => {}

            Self::Login { username, password } => {
                b.astring(username).secret(password);
            }
            Self::Authenticate {
                mechanism,
                initial_response,
            } => {
                b.atom(mechanism);
                if let Some(ir) = initial_response {
                    b.secret(ir);
                }
            }
            Self::Enable { capabilities } => {
                for cap in capabilities {
                    b.atom(cap);
                }
            }
            Self::Select { mailbox }
            | Self::Examine { mailbox }
            | Self::Create { mailbox }
            | Self::Delete { mailbox }
            | Self::Subscribe { mailbox }
            | Self::Unsubscribe { mailbox }
            | Self::GetAcl { mailbox }
            | Self::MyRights { mailbox }
            | Self::GetQuotaRoot { mailbox } => {
                b.astring(mailbox.as_str());
            }
            Self::Rename { from, to } => {
                b.astring(from.as_str()).astring(to.as_str());
            }
            Self::List { reference, pattern } | Self::Lsub { reference, pattern } => {
                b.astring(reference).astring(pattern);
            }
            Self::Status { mailbox, items } => {
                let names: Vec<&str> = items.iter().map(|i| i.as_str()).collect();
                b.astring(mailbox.as_str())
                    .atom(&format!("({})", names.join(" ")));
            }
            Self::Append {
                mailbox,
                flags,
                date,
                message,
            } => {
                append_prefix(&mut b, mailbox, flags, date.as_deref());
                b.literal(message);
            }
            Self::SetAcl {
                mailbox,
                identifier,
                mode,
                rights,
            } => {
                b.astring(mailbox.as_str())
                    .astring(identifier)
                    .astring(&format!("{}{}", mode.prefix(), rights));
            }
            Self::DeleteAcl {
                mailbox,
                identifier,
            }
            | Self::ListRights {
                mailbox,
                identifier,
            } => {
                b.astring(mailbox.as_str()).astring(identifier);
            }
            Self::GetQuota { root } => {
                b.astring(root);
            }
            Self::SetQuota { root, limits } => {
                let pairs: Vec<String> = limits
                    .iter()
                    .map(|(name, limit)| format!("{name} {limit}"))
                    .collect();
                b.astring(root).atom(&format!("({})", pairs.join(" ")));
            }
            Self::UidExpunge { uids } => {
                b.atom(&uids.to_string());
            }
            Self::Search {
                charset, criteria, ..
            } => {
                if let Some(charset) = charset {
                    b.atom("CHARSET").astring(charset);
                }
                criteria.encode(&mut b);
            }
            Self::Fetch {
                sequence, items, ..
            } => {
                b.atom(&sequence.to_string()).atom(&items.encode());
            }
            Self::Store {
                sequence,
                action,
                silent,
                ..
            } => {
                b.atom(&sequence.to_string()).atom(&action.encode(*silent));
            }
            Self::Copy {
                sequence, mailbox, ..
            }
            | Self::Move {
                sequence, mailbox, ..
            } => {
                b.atom(&sequence.to_string()).astring(mailbox.as_str());
            }
        }

        b.finish()
    }

    /// Encodes `APPEND` up to a `{len}` literal header; the caller streams
    /// the message bytes and the closing CRLF after the continuation.
    #[must_use]
    pub fn append_streamed(
        tag: &Tag,
        mailbox: &Mailbox,
        flags: &[Flag],
        date: Option<&str>,
        len: u64,
    ) -> Request {
        let mut b = CommandBuilder::new(tag, "APPEND");
        append_prefix(&mut b, mailbox, flags, date);
        b.literal_header(len);
        b.finish_streamed()
    }
}

fn append_prefix(b: &mut CommandBuilder, mailbox: &Mailbox, flags: &[Flag], date: Option<&str>) {
    b.astring(mailbox.as_str());
    if !flags.is_empty() {
        b.atom(&types::flag_list(flags));
    }
    if let Some(date) = date {
        b.string(date);
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn tag() -> Tag {
        Tag::new("00001")
    }

    fn wire(cmd: &Command) -> Vec<u8> {
        cmd.serialize(&tag()).to_bytes()
    }

    #[test]
    fn bare_commands() {
        assert_eq!(wire(&Command::Capability), b"00001 CAPABILITY\r\n");
        assert_eq!(wire(&Command::Idle), b"00001 IDLE\r\n");
        assert_eq!(wire(&Command::Namespace), b"00001 NAMESPACE\r\n");
    }

    #[test]
    fn login_masks_password() {
        let cmd = Command::Login {
            username: "bob".to_string(),
            password: "secret".to_string(),
        };
        let req = cmd.serialize(&tag());
        assert_eq!(req.to_bytes(), b"00001 LOGIN bob secret\r\n");
        assert_eq!(req.log_line(), "00001 LOGIN bob ****");
    }

    #[test]
    fn login_quotes_specials() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "pass word".to_string(),
        };
        assert_eq!(wire(&cmd), b"00001 LOGIN user@example.com \"pass word\"\r\n");
    }

    #[test]
    fn authenticate_with_initial_response() {
        let cmd = Command::Authenticate {
            mechanism: "PLAIN".to_string(),
            initial_response: Some("AGJvYgBzZWNyZXQ=".to_string()),
        };
        let req = cmd.serialize(&tag());
        assert_eq!(req.to_bytes(), b"00001 AUTHENTICATE PLAIN AGJvYgBzZWNyZXQ=\r\n");
        assert_eq!(req.log_line(), "00001 AUTHENTICATE PLAIN ****");
    }

    #[test]
    fn select_and_list() {
        let cmd = Command::Select {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(wire(&cmd), b"00001 SELECT INBOX\r\n");

        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
        };
        assert_eq!(wire(&cmd), b"00001 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn status_items() {
        let cmd = Command::Status {
            mailbox: Mailbox::new("Sent"),
            items: vec![StatusAttribute::Messages, StatusAttribute::Unseen],
        };
        assert_eq!(wire(&cmd), b"00001 STATUS Sent (MESSAGES UNSEEN)\r\n");
    }

    #[test]
    fn append_splits_at_literal() {
        let cmd = Command::Append {
            mailbox: Mailbox::new("Drafts"),
            flags: vec![Flag::Seen, Flag::Draft],
            date: None,
            message: b"Subject: hi\r\n\r\nbody".to_vec(),
        };
        let req = cmd.serialize(&tag());
        assert_eq!(req.parts().len(), 2);
        assert_eq!(
            req.parts()[0],
            b"00001 APPEND Drafts (\\Seen \\Draft) {19}\r\n"
        );
        assert_eq!(req.parts()[1], b"Subject: hi\r\n\r\nbody\r\n");
    }

    #[test]
    fn append_streamed_header() {
        let req = Command::append_streamed(
            &tag(),
            &Mailbox::inbox(),
            &[],
            Some("17-Jul-1996 02:44:25 -0700"),
            310,
        );
        assert_eq!(
            req.to_bytes(),
            b"00001 APPEND INBOX \"17-Jul-1996 02:44:25 -0700\" {310}\r\n"
        );
    }

    #[test]
    fn uid_variants() {
        let cmd = Command::Fetch {
            sequence: SequenceSet::All,
            items: FetchItems::Items(vec![FetchAttribute::Flags, FetchAttribute::Uid]),
            uid: true,
        };
        assert_eq!(wire(&cmd), b"00001 UID FETCH 1:* (FLAGS UID)\r\n");

        let cmd = Command::Store {
            sequence: SequenceSet::range(2, 4).unwrap(),
            action: StoreAction::AddFlags(vec![Flag::Deleted]),
            uid: false,
            silent: true,
        };
        assert_eq!(wire(&cmd), b"00001 STORE 2:4 +FLAGS.SILENT (\\Deleted)\r\n");

        let cmd = Command::Move {
            sequence: SequenceSet::single(7).unwrap(),
            mailbox: Mailbox::new("Archive/2024"),
            uid: true,
        };
        assert_eq!(wire(&cmd), b"00001 UID MOVE 7 Archive/2024\r\n");
    }

    #[test]
    fn search_with_charset_and_literal() {
        let cmd = Command::Search {
            charset: Some("UTF-8".to_string()),
            criteria: SearchCriteria::And(vec![
                SearchCriteria::Subject("\u{fc}ber".to_string()),
                SearchCriteria::From("m\u{fc}ller".to_string()),
            ]),
            uid: false,
        };
        let req = cmd.serialize(&tag());
        assert_eq!(req.parts().len(), 3);
        assert_eq!(req.parts()[0], b"00001 SEARCH CHARSET UTF-8 SUBJECT {5}\r\n");
        assert_eq!(req.parts()[1], "\u{fc}ber FROM {7}\r\n".as_bytes());
        assert_eq!(req.parts()[2], "m\u{fc}ller\r\n".as_bytes());
    }

    #[test]
    fn acl_and_quota_commands() {
        let cmd = Command::SetAcl {
            mailbox: Mailbox::inbox(),
            identifier: "fred".to_string(),
            mode: AclModifyMode::Add,
            rights: Rights::new("rw"),
        };
        assert_eq!(wire(&cmd), b"00001 SETACL INBOX fred +rw\r\n");

        let cmd = Command::SetQuota {
            root: String::new(),
            limits: vec![(QuotaResourceName::Storage, 512)],
        };
        assert_eq!(wire(&cmd), b"00001 SETQUOTA \"\" (STORAGE 512)\r\n");

        let cmd = Command::UidExpunge {
            uids: UidSet::parse("3000:3002").unwrap(),
        };
        assert_eq!(wire(&cmd), b"00001 UID EXPUNGE 3000:3002\r\n");
    }

    proptest! {
        #[test]
        fn password_never_reaches_log(password in "[ -~]{1,40}") {
            let cmd = Command::Login {
                username: "bob".to_string(),
                password: password.clone(),
            };
            let req = cmd.serialize(&tag());
            prop_assert_eq!(req.log_line(), "00001 LOGIN bob ****");
        }

        #[test]
        fn literal_parts_carry_exact_length(body in proptest::collection::vec(any::<u8>(), 0..512)) {
            let cmd = Command::Append {
                mailbox: Mailbox::inbox(),
                flags: vec![],
                date: None,
                message: body.clone(),
            };
            let req = cmd.serialize(&tag());
            let header = format!("00001 APPEND INBOX {{{}}}\r\n", body.len());
            prop_assert_eq!(&req.parts()[0], header.as_bytes());
            prop_assert_eq!(&req.parts()[1][..body.len()], &body[..]);
            prop_assert_eq!(req.parts()[1].len(), body.len() + 2);
        }
    }
}
