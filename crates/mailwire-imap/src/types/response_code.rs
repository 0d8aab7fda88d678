//! Response codes.

use super::{Capability, Flag, SeqNum, Uid, UidSet, UidValidity};

/// Bracketed response code carried by a status response, e.g. `[TRYCREATE]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: Human-readable message that MUST be shown to user.
    Alert,
    /// CAPABILITY list sent inside a greeting or completion.
    Capability(Vec<Capability>),
    /// PARSE: Error parsing message.
    Parse,
    /// PERMANENTFLAGS: Flags that can be changed permanently.
    PermanentFlags(Vec<Flag>),
    /// READ-ONLY: Mailbox selected as read-only.
    ReadOnly,
    /// READ-WRITE: Mailbox selected as read-write.
    ReadWrite,
    /// TRYCREATE: Mailbox doesn't exist, but can be created.
    TryCreate,
    /// UIDNEXT: Next UID to be assigned.
    UidNext(Uid),
    /// UIDVALIDITY: Unique identifier validity value.
    UidValidity(UidValidity),
    /// UNSEEN: First unseen message sequence number.
    Unseen(SeqNum),
    /// APPENDUID (RFC 4315).
    AppendUid(AppendUid),
    /// COPYUID (RFC 4315).
    CopyUid(CopyUid),
    /// UIDNOTSTICKY (RFC 4315).
    UidNotSticky,
    /// Unknown response code, kept verbatim.
    Unknown(String),
}

/// UIDs assigned to appended messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendUid {
    /// UIDVALIDITY of the destination mailbox.
    pub uid_validity: UidValidity,
    /// UIDs of the appended message(s).
    pub uids: UidSet,
}

/// Source and destination UIDs of copied or moved messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyUid {
    /// UIDVALIDITY of the destination mailbox.
    pub uid_validity: UidValidity,
    /// UIDs in the source mailbox.
    pub source: UidSet,
    /// UIDs assigned in the destination mailbox.
    pub destination: UidSet,
}

impl CopyUid {
    /// Pairs each source UID with its destination UID.
    ///
    /// The server lists both sets in the same order, so the pairing is
    /// positional.
    #[must_use]
    pub fn pairs(&self) -> Vec<(Uid, Uid)> {
        self.source
            .to_vec()
            .into_iter()
            .zip(self.destination.to_vec())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn copy_uid_pairs_positionally() {
        let code = CopyUid {
            uid_validity: UidValidity::new(38505).unwrap(),
            source: UidSet::parse("304,319:320").unwrap(),
            destination: UidSet::parse("3956:3958").unwrap(),
        };
        let pairs: Vec<(u32, u32)> = code
            .pairs()
            .into_iter()
            .map(|(a, b)| (a.get(), b.get()))
            .collect();
        assert_eq!(pairs, vec![(304, 3956), (319, 3957), (320, 3958)]);
    }
}
