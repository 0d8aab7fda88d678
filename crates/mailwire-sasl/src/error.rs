//! Error types for SASL mechanisms.

/// Result type alias for SASL operations.
pub type Result<T> = std::result::Result<T, SaslError>;

/// Errors a mechanism reports instead of a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaslError {
    /// The mechanism needs a server challenge but was asked for an
    /// initial response.
    #[error("{mechanism} cannot send an initial response")]
    ChallengeRequired {
        /// Mechanism name.
        mechanism: &'static str,
    },

    /// The server kept challenging after the exchange was complete.
    #[error("{mechanism} received an unexpected challenge after {steps} step(s)")]
    UnexpectedChallenge {
        /// Mechanism name.
        mechanism: &'static str,
        /// Steps already answered.
        steps: usize,
    },

    /// Credentials cannot be encoded for this mechanism.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// A challenge could not be interpreted.
    #[error("malformed challenge: {0}")]
    MalformedChallenge(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_mechanism() {
        let err = SaslError::UnexpectedChallenge {
            mechanism: "PLAIN",
            steps: 1,
        };
        assert_eq!(
            err.to_string(),
            "PLAIN received an unexpected challenge after 1 step(s)"
        );
        let err = SaslError::ChallengeRequired {
            mechanism: "CRAM-MD5",
        };
        assert!(err.to_string().starts_with("CRAM-MD5"));
    }
}
