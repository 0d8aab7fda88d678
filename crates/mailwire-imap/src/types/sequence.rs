//! Sequence sets for message ranges.

use super::{SeqNum, Uid};

/// Sequence set for specifying message ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// Single sequence number.
    Single(SeqNum),
    /// Range of sequence numbers (inclusive).
    Range(SeqNum, SeqNum),
    /// Range from start to end of mailbox.
    RangeFrom(SeqNum),
    /// All messages (`1:*`).
    All,
    /// Multiple sequence specifications.
    Set(Vec<Self>),
}

impl SequenceSet {
    /// Creates a sequence set from a single number.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        SeqNum::new(n).map(Self::Single)
    }

    /// Creates a range sequence set.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        Some(Self::Range(SeqNum::new(start)?, SeqNum::new(end)?))
    }
}

impl std::fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => write!(f, "1:*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
        }
    }
}

/// UID-based sequence set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidSet {
    /// Single UID.
    Single(Uid),
    /// Range of UIDs (inclusive).
    Range(Uid, Uid),
    /// Range from start to highest UID.
    RangeFrom(Uid),
    /// All messages.
    All,
    /// Multiple UID specifications.
    Set(Vec<Self>),
}

impl UidSet {
    /// Creates a UID set from a single UID.
    #[must_use]
    pub const fn single(uid: Uid) -> Self {
        Self::Single(uid)
    }

    /// Creates a UID set from a range.
    #[must_use]
    pub const fn range(start: Uid, end: Uid) -> Self {
        Self::Range(start, end)
    }

    /// Parses a closed uid-set such as `4:6,9` as found in COPYUID and
    /// APPENDUID codes. Open ranges (`*`) are rejected.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut items = Vec::new();
        for part in s.split(',') {
            let item = match part.split_once(':') {
                Some((a, b)) => Self::Range(parse_uid(a)?, parse_uid(b)?),
                None => Self::Single(parse_uid(part)?),
            };
            items.push(item);
        }
        match items.len() {
            0 => None,
            1 => items.pop(),
            _ => Some(Self::Set(items)),
        }
    }

    /// Expands a closed set into individual UIDs in wire order.
    ///
    /// Ranges are expanded low to high regardless of how they were written.
    /// Open ranges contribute nothing.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Uid> {
        let mut out = Vec::new();
        self.expand_into(&mut out);
        out
    }

    fn expand_into(&self, out: &mut Vec<Uid>) {
        match self {
            Self::Single(uid) => out.push(*uid),
            Self::Range(a, b) => {
                let (lo, hi) = if a <= b { (a.get(), b.get()) } else { (b.get(), a.get()) };
                out.extend((lo..=hi).filter_map(Uid::new));
            }
            Self::RangeFrom(_) | Self::All => {}
            Self::Set(items) => {
                for item in items {
                    item.expand_into(out);
                }
            }
        }
    }
}

fn parse_uid(s: &str) -> Option<Uid> {
    s.trim().parse().ok().and_then(Uid::new)
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => write!(f, "1:*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
        }
    }
}

/// Reinterprets a UID set as the set argument of a `UID` command.
impl From<&UidSet> for SequenceSet {
    fn from(set: &UidSet) -> Self {
        match set {
            UidSet::Single(u) => Self::Single(SeqNum(u.0)),
            UidSet::Range(a, b) => Self::Range(SeqNum(a.0), SeqNum(b.0)),
            UidSet::RangeFrom(u) => Self::RangeFrom(SeqNum(u.0)),
            UidSet::All => Self::All,
            UidSet::Set(items) => Self::Set(items.iter().map(Self::from).collect()),
        }
    }
}

/// Reads the set argument of a `UID` command back as UIDs.
impl From<&SequenceSet> for UidSet {
    fn from(set: &SequenceSet) -> Self {
        match set {
            SequenceSet::Single(n) => Self::Single(Uid(n.0)),
            SequenceSet::Range(a, b) => Self::Range(Uid(a.0), Uid(b.0)),
            SequenceSet::RangeFrom(n) => Self::RangeFrom(Uid(n.0)),
            SequenceSet::All => Self::All,
            SequenceSet::Set(items) => Self::Set(items.iter().map(Self::from).collect()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn uid_set_converts_both_ways() {
        let uids = UidSet::parse("4:6,9").unwrap();
        let seq = SequenceSet::from(&uids);
        assert_eq!(seq.to_string(), "4:6,9");
        assert_eq!(UidSet::from(&seq), uids);
        assert_eq!(SequenceSet::from(&UidSet::All), SequenceSet::All);
    }

    fn uid(n: u32) -> Uid {
        Uid::new(n).unwrap()
    }

    #[test]
    fn sequence_set_display() {
        assert_eq!(SequenceSet::single(1).unwrap().to_string(), "1");
        assert_eq!(SequenceSet::range(2, 10).unwrap().to_string(), "2:10");
        assert_eq!(
            SequenceSet::RangeFrom(SeqNum::new(5).unwrap()).to_string(),
            "5:*"
        );
        assert_eq!(SequenceSet::All.to_string(), "1:*");
        let set = SequenceSet::Set(vec![
            SequenceSet::single(1).unwrap(),
            SequenceSet::range(3, 4).unwrap(),
        ]);
        assert_eq!(set.to_string(), "1,3:4");
    }

    #[test]
    fn zero_is_not_a_sequence_number() {
        assert!(SequenceSet::single(0).is_none());
        assert!(SequenceSet::range(0, 3).is_none());
    }

    #[test]
    fn uid_set_parse_and_expand() {
        let set = UidSet::parse("4:6,9").unwrap();
        assert_eq!(set.to_string(), "4:6,9");
        assert_eq!(set.to_vec(), vec![uid(4), uid(5), uid(6), uid(9)]);
    }

    #[test]
    fn uid_set_parse_single() {
        assert_eq!(UidSet::parse("17"), Some(UidSet::Single(uid(17))));
    }

    #[test]
    fn uid_set_reversed_range_expands_ascending() {
        let set = UidSet::parse("3:1").unwrap();
        assert_eq!(set.to_vec(), vec![uid(1), uid(2), uid(3)]);
    }

    #[test]
    fn uid_set_rejects_open_or_invalid() {
        assert!(UidSet::parse("1:*").is_none());
        assert!(UidSet::parse("").is_none());
        assert!(UidSet::parse("0").is_none());
        assert!(UidSet::parse("x").is_none());
    }
}
