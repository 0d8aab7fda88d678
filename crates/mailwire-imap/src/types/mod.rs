//! Core IMAP types.
//!
//! Value types shared by the command builder, the response decoders, and the
//! connection state: flags, mailboxes, sequence sets, response codes, and the
//! ACL, QUOTA, and NAMESPACE extension data.

#![allow(clippy::missing_const_for_fn)]

mod acl;
mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod namespace;
mod quota;
mod response_code;
mod sequence;

pub use acl::{Acl, AclEntry, AclModifyMode, ListRights, MyRights, Rights};
pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus, SelectedFolder};
pub use namespace::{NamespaceEntry, Namespaces};
pub use quota::{Quota, QuotaResource, QuotaResourceName, QuotaRoot, QuotaRootInfo};
pub use response_code::{AppendUid, CopyUid, ResponseCode};
pub use sequence::{SequenceSet, UidSet};
