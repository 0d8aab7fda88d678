//! Quota types (RFC 2087).

/// A resource named in a QUOTA response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaResourceName {
    /// Sum of message sizes, in units of 1024 octets.
    Storage,
    /// Number of messages.
    Message,
    /// Any other resource name.
    Other(String),
}

impl QuotaResourceName {
    /// Parses a resource name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "STORAGE" => Self::Storage,
            "MESSAGE" => Self::Message,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl std::fmt::Display for QuotaResourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage => write!(f, "STORAGE"),
            Self::Message => write!(f, "MESSAGE"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Usage and limit of one quota resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaResource {
    /// Resource name.
    pub name: QuotaResourceName,
    /// Current usage.
    pub usage: u64,
    /// Limit.
    pub limit: u64,
}

/// `* QUOTA` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quota {
    /// Quota root name.
    pub root: String,
    /// Resource usages and limits; empty means unlimited.
    pub resources: Vec<QuotaResource>,
}

/// `* QUOTAROOT` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRoot {
    /// Mailbox the roots apply to.
    pub mailbox: String,
    /// Quota roots for the mailbox.
    pub roots: Vec<String>,
}

/// Result of GETQUOTAROOT: the roots plus every QUOTA that came with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaRootInfo {
    /// QUOTAROOT responses.
    pub roots: Vec<QuotaRoot>,
    /// QUOTA responses.
    pub quotas: Vec<Quota>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_name_parse() {
        assert_eq!(QuotaResourceName::parse("storage"), QuotaResourceName::Storage);
        assert_eq!(QuotaResourceName::parse("MESSAGE"), QuotaResourceName::Message);
        assert_eq!(
            QuotaResourceName::parse("X-FOLDERS").to_string(),
            "X-FOLDERS"
        );
    }
}
