//! # mailwire-sasl
//!
//! Client-side SASL mechanisms for IMAP `AUTHENTICATE` and similar
//! commands.
//!
//! Mechanisms deal in raw bytes. Base64 framing belongs to the protocol
//! that carries the exchange.
//!
//! Implements:
//! - PLAIN (RFC 4616)
//! - LOGIN (draft-murchison-sasl-login)
//! - CRAM-MD5 (RFC 2195)
//! - XOAUTH2 (Google/Microsoft)
//! - OAUTHBEARER (RFC 7628)
//!
//! ## Example
//!
//! ```
//! use mailwire_sasl::{Mechanism, Plain};
//!
//! let mut plain = Plain::new("bob", "secret");
//! assert_eq!(plain.name(), "PLAIN");
//! let response = plain.step(None).unwrap();
//! assert_eq!(response, b"\0bob\0secret");
//! ```

#![forbid(unsafe_code)]

mod cram_md5;
mod error;
mod login;
mod oauth;
mod plain;

pub use cram_md5::CramMd5;
pub use error::{Result, SaslError};
pub use login::Login;
pub use oauth::{OAuthBearer, XOAuth2};
pub use plain::Plain;

/// A client-side SASL mechanism.
///
/// The protocol engine calls [`step`](Self::step) once for the initial
/// response, if the mechanism has one and the server accepts it, and once
/// per server challenge after that.
pub trait Mechanism: Send {
    /// Registered mechanism name, e.g. `PLAIN`.
    fn name(&self) -> &'static str;

    /// Returns true if the first step can be sent with the command itself.
    fn supports_initial_response(&self) -> bool;

    /// Produces the next client response.
    ///
    /// `challenge` is `None` when asking for the initial response and the
    /// decoded server challenge otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange cannot continue; the caller then
    /// cancels the authentication.
    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Vec<u8>>;

    /// The identity that authenticated, valid after the server accepted
    /// the exchange.
    fn authenticated_username(&self) -> &str;
}

/// Looks up whether `name` is one of the mechanisms this crate implements.
#[must_use]
pub fn is_supported(name: &str) -> bool {
    matches!(
        name.to_ascii_uppercase().as_str(),
        "PLAIN" | "LOGIN" | "CRAM-MD5" | "XOAUTH2" | "OAUTHBEARER"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_names_ignore_case() {
        assert!(is_supported("plain"));
        assert!(is_supported("CRAM-MD5"));
        assert!(!is_supported("SCRAM-SHA-256"));
    }

    #[test]
    fn mechanisms_are_object_safe() {
        let mechanisms: Vec<Box<dyn Mechanism>> = vec![
            Box::new(Plain::new("a", "b")),
            Box::new(Login::new("a", "b")),
            Box::new(CramMd5::new("a", "b")),
            Box::new(XOAuth2::new("a", "t")),
            Box::new(OAuthBearer::new("a", "t")),
        ];
        let names: Vec<&str> = mechanisms.iter().map(|m| m.name()).collect();
        assert_eq!(names, ["PLAIN", "LOGIN", "CRAM-MD5", "XOAUTH2", "OAUTHBEARER"]);
    }
}
