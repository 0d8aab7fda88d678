//! Error types for the IMAP engine.

use std::time::Duration;

use thiserror::Error;

use crate::types::ResponseCode;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Malformed server response.
    #[error("Parse error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// LOGIN or AUTHENTICATE was rejected.
    #[error("Authentication failed: {text}")]
    Auth {
        /// Server text.
        text: String,
        /// Response code, e.g. `AUTHENTICATIONFAILED`.
        code: Option<ResponseCode>,
    },

    /// Server returned NO.
    #[error("Server returned NO: {text}")]
    No {
        /// Server text.
        text: String,
        /// Response code, e.g. `TRYCREATE`.
        code: Option<ResponseCode>,
    },

    /// Server returned BAD.
    #[error("Server returned BAD: {text}")]
    Bad {
        /// Server text.
        text: String,
        /// Response code.
        code: Option<ResponseCode>,
    },

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// A read or write did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The command is not legal in the current connection state.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Unexpected data from the server, such as a foreign tag.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The SASL mechanism could not produce a response.
    #[error("SASL error: {0}")]
    Sasl(#[from] mailwire_sasl::SaslError),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Command issued in the wrong state. Nothing was sent.
    PreconditionViolation,
    /// Malformed or unexpected server data. The connection is suspect.
    ProtocolError,
    /// Tagged NO or BAD. The connection remains usable.
    ServerRejection,
    /// I/O failure, timeout, or remote close. The connection is unusable.
    TransportFailure,
}

impl Error {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Precondition(_) => ErrorKind::PreconditionViolation,
            Self::Parse { .. } | Self::Protocol(_) | Self::Sasl(_) => ErrorKind::ProtocolError,
            Self::Auth { .. } | Self::No { .. } | Self::Bad { .. } => ErrorKind::ServerRejection,
            Self::Io(_) | Self::Tls(_) | Self::InvalidDnsName(_) | Self::Timeout(_) | Self::Bye(_) => {
                ErrorKind::TransportFailure
            }
        }
    }

    /// Returns the response code attached to a server rejection.
    #[must_use]
    pub const fn code(&self) -> Option<&ResponseCode> {
        match self {
            Self::Auth { code, .. } | Self::No { code, .. } | Self::Bad { code, .. } => {
                code.as_ref()
            }
            _ => None,
        }
    }

    /// Returns true if the connection can no longer be trusted to carry
    /// another command.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ProtocolError | ErrorKind::TransportFailure
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            Error::Precondition("idle".into()).kind(),
            ErrorKind::PreconditionViolation
        );
        assert_eq!(
            Error::Protocol("tag".into()).kind(),
            ErrorKind::ProtocolError
        );
        let no = Error::No {
            text: "no such mailbox".into(),
            code: Some(ResponseCode::TryCreate),
        };
        assert_eq!(no.kind(), ErrorKind::ServerRejection);
        assert_eq!(no.code(), Some(&ResponseCode::TryCreate));
        assert!(!no.is_fatal());
        let io = Error::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert_eq!(io.kind(), ErrorKind::TransportFailure);
        assert!(io.is_fatal());
    }
}
