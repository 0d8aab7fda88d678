//! Access control list types (RFC 4314).

use std::fmt;

/// A set of ACL rights, e.g. `lrswipkxtea`.
///
/// Rights are single characters; the set keeps them sorted and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rights(String);

impl Rights {
    /// Builds a rights set from its wire form.
    #[must_use]
    pub fn new(rights: &str) -> Self {
        let mut chars: Vec<char> = rights.chars().filter(|c| !c.is_whitespace()).collect();
        chars.sort_unstable();
        chars.dedup();
        Self(chars.into_iter().collect())
    }

    /// Returns true if the set grants the given right.
    #[must_use]
    pub fn has(&self, right: char) -> bool {
        self.0.contains(right)
    }

    /// Returns the rights as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How SETACL modifies an identifier's rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclModifyMode {
    /// Replace the identifier's rights.
    Replace,
    /// Add to the identifier's rights (`+` prefix).
    Add,
    /// Remove from the identifier's rights (`-` prefix).
    Remove,
}

impl AclModifyMode {
    /// Returns the wire prefix for the rights argument.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Replace => "",
            Self::Add => "+",
            Self::Remove => "-",
        }
    }
}

/// One identifier/rights pair from an ACL response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    /// User or group identifier.
    pub identifier: String,
    /// Rights granted to the identifier.
    pub rights: Rights,
}

/// `* ACL` response: all entries for a mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    /// Mailbox the ACL applies to.
    pub mailbox: String,
    /// Identifier/rights pairs.
    pub entries: Vec<AclEntry>,
}

/// `* LISTRIGHTS` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRights {
    /// Mailbox the rights apply to.
    pub mailbox: String,
    /// Identifier the rights apply to.
    pub identifier: String,
    /// Rights always granted to the identifier.
    pub required: Rights,
    /// Groups of rights that may be granted; rights in one group go together.
    pub optional: Vec<Rights>,
}

/// `* MYRIGHTS` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MyRights {
    /// Mailbox the rights apply to.
    pub mailbox: String,
    /// Rights the current user has.
    pub rights: Rights,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rights_are_sorted_and_unique() {
        let rights = Rights::new("srwlls");
        assert_eq!(rights.as_str(), "lrsw");
        assert!(rights.has('r'));
        assert!(!rights.has('a'));
    }

    #[test]
    fn modify_mode_prefix() {
        assert_eq!(AclModifyMode::Replace.prefix(), "");
        assert_eq!(AclModifyMode::Add.prefix(), "+");
        assert_eq!(AclModifyMode::Remove.prefix(), "-");
    }
}
