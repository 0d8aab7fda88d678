//! Server capabilities and response status.

/// Status keyword of a tagged or status-style untagged response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed (operational error).
    No,
    /// Command failed (protocol/syntax error).
    Bad,
    /// Server greeting (pre-authenticated).
    PreAuth,
    /// Server is closing connection.
    Bye,
}

impl Status {
    /// Returns true if this is a successful status.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }

    /// Returns the wire keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
            Self::PreAuth => "PREAUTH",
            Self::Bye => "BYE",
        }
    }
}

/// Server capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1` (RFC 3501)
    Imap4Rev1,
    /// `IMAP4rev2` (RFC 9051)
    Imap4Rev2,
    /// IDLE command support (RFC 2177)
    Idle,
    /// NAMESPACE command support (RFC 2342)
    Namespace,
    /// UIDPLUS extension (RFC 4315)
    UidPlus,
    /// MOVE extension (RFC 6851)
    Move,
    /// LITERAL+ extension (RFC 7888)
    LiteralPlus,
    /// STARTTLS support
    StartTls,
    /// LOGIN disabled
    LoginDisabled,
    /// AUTH mechanism
    Auth(String),
    /// SASL initial response (RFC 4959)
    SaslIr,
    /// ENABLE command (RFC 5161)
    Enable,
    /// Access control lists (RFC 4314)
    Acl,
    /// Quota (RFC 2087)
    Quota,
    /// UNSELECT command (RFC 3691)
    Unselect,
    /// UTF8=ACCEPT (RFC 6855)
    Utf8Accept,
    /// CONDSTORE (RFC 7162)
    CondStore,
    /// Unknown capability
    Unknown(String),
}

impl Capability {
    /// Parses a capability string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IMAP4REV2" => Self::Imap4Rev2,
            "IDLE" => Self::Idle,
            "NAMESPACE" => Self::Namespace,
            "UIDPLUS" => Self::UidPlus,
            "MOVE" => Self::Move,
            "LITERAL+" => Self::LiteralPlus,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            "SASL-IR" => Self::SaslIr,
            "ENABLE" => Self::Enable,
            "ACL" => Self::Acl,
            "QUOTA" => Self::Quota,
            "UNSELECT" => Self::Unselect,
            "UTF8=ACCEPT" => Self::Utf8Accept,
            "CONDSTORE" => Self::CondStore,
            _ if upper.starts_with("AUTH=") => Self::Auth(s[5..].to_string()),
            _ => Self::Unknown(s.to_string()),
        }
    }

    /// Returns true if this is `AUTH=<mechanism>` for the given mechanism.
    #[must_use]
    pub fn is_auth(&self, mechanism: &str) -> bool {
        matches!(self, Self::Auth(m) if m.eq_ignore_ascii_case(mechanism))
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => write!(f, "IMAP4rev1"),
            Self::Imap4Rev2 => write!(f, "IMAP4rev2"),
            Self::Idle => write!(f, "IDLE"),
            Self::Namespace => write!(f, "NAMESPACE"),
            Self::UidPlus => write!(f, "UIDPLUS"),
            Self::Move => write!(f, "MOVE"),
            Self::LiteralPlus => write!(f, "LITERAL+"),
            Self::StartTls => write!(f, "STARTTLS"),
            Self::LoginDisabled => write!(f, "LOGINDISABLED"),
            Self::Auth(mech) => write!(f, "AUTH={mech}"),
            Self::SaslIr => write!(f, "SASL-IR"),
            Self::Enable => write!(f, "ENABLE"),
            Self::Acl => write!(f, "ACL"),
            Self::Quota => write!(f, "QUOTA"),
            Self::Unselect => write!(f, "UNSELECT"),
            Self::Utf8Accept => write!(f, "UTF8=ACCEPT"),
            Self::CondStore => write!(f, "CONDSTORE"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        assert!(Status::Ok.is_ok());
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::No.is_ok());
        assert!(!Status::Bad.is_ok());
        assert!(!Status::Bye.is_ok());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Capability::parse("imap4rev1"), Capability::Imap4Rev1);
        assert_eq!(Capability::parse("sasl-ir"), Capability::SaslIr);
        assert_eq!(Capability::parse("StartTLS"), Capability::StartTls);
    }

    #[test]
    fn parse_auth_keeps_mechanism_case() {
        assert_eq!(
            Capability::parse("auth=xoauth2"),
            Capability::Auth("xoauth2".to_string())
        );
        assert!(Capability::parse("AUTH=PLAIN").is_auth("plain"));
        assert!(!Capability::parse("AUTH=PLAIN").is_auth("LOGIN"));
    }

    #[test]
    fn parse_unknown_preserves_text() {
        assert_eq!(
            Capability::parse("X-GM-EXT-1"),
            Capability::Unknown("X-GM-EXT-1".to_string())
        );
    }

    #[test]
    fn display_round_trips_known_atoms() {
        for atom in ["IMAP4rev1", "IDLE", "SASL-IR", "AUTH=PLAIN", "UIDPLUS", "ACL"] {
            assert_eq!(Capability::parse(atom).to_string(), atom);
        }
    }
}
