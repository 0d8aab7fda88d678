//! `OAuth2` bearer token mechanisms.
//!
//! - XOAUTH2 (Google/Microsoft proprietary):
//!   `user=<user>\x01auth=Bearer <token>\x01\x01`
//! - OAUTHBEARER (RFC 7628): `n,a=<user>,\x01auth=Bearer <token>\x01\x01`
//!
//! When the token is refused, the server sends a JSON error as a challenge
//! before the tagged NO. The client answers it with a dummy response to
//! finish the exchange; the JSON is kept for the caller.

use crate::error::{Result, SaslError};
use crate::Mechanism;

/// State shared by both bearer mechanisms.
struct Bearer {
    user: String,
    token: String,
    sent: bool,
    error_detail: Option<String>,
}

impl Bearer {
    fn new(user: String, token: String) -> Self {
        Self {
            user,
            token,
            sent: false,
            error_detail: None,
        }
    }

    fn check(&self) -> Result<()> {
        let bad = |s: &str| s.contains('\x01');
        if bad(&self.user) || bad(&self.token) {
            return Err(SaslError::InvalidCredentials(
                "bearer credentials must not contain ^A".to_string(),
            ));
        }
        Ok(())
    }

    /// First call produces `message`; a later challenge is a server error
    /// report, answered with `ack`.
    fn step(
        &mut self,
        mechanism: &'static str,
        challenge: Option<&[u8]>,
        message: impl FnOnce(&Self) -> String,
        ack: &[u8],
    ) -> Result<Vec<u8>> {
        if !self.sent {
            self.check()?;
            self.sent = true;
            return Ok(message(self).into_bytes());
        }
        match challenge {
            Some(detail) if self.error_detail.is_none() => {
                self.error_detail = Some(String::from_utf8_lossy(detail).into_owned());
                Ok(ack.to_vec())
            }
            _ => Err(SaslError::UnexpectedChallenge {
                mechanism,
                steps: 2,
            }),
        }
    }
}

/// XOAUTH2 mechanism.
pub struct XOAuth2(Bearer);

impl XOAuth2 {
    /// Creates an XOAUTH2 exchange for `user` with an access token.
    #[must_use]
    pub fn new(user: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self(Bearer::new(user.into(), access_token.into()))
    }

    /// Server error JSON received after a refused token.
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        self.0.error_detail.as_deref()
    }
}

impl std::fmt::Debug for XOAuth2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XOAuth2")
            .field("user", &self.0.user)
            .finish_non_exhaustive()
    }
}

impl Mechanism for XOAuth2 {
    fn name(&self) -> &'static str {
        "XOAUTH2"
    }

    fn supports_initial_response(&self) -> bool {
        true
    }

    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Vec<u8>> {
        self.0.step(
            "XOAUTH2",
            challenge,
            |b| format!("user={}\x01auth=Bearer {}\x01\x01", b.user, b.token),
            b"",
        )
    }

    fn authenticated_username(&self) -> &str {
        &self.0.user
    }
}

/// OAUTHBEARER mechanism (RFC 7628).
pub struct OAuthBearer(Bearer);

impl OAuthBearer {
    /// Creates an OAUTHBEARER exchange for `user` with an access token.
    #[must_use]
    pub fn new(user: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self(Bearer::new(user.into(), access_token.into()))
    }

    /// Server error JSON received after a refused token.
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        self.0.error_detail.as_deref()
    }
}

impl std::fmt::Debug for OAuthBearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthBearer")
            .field("user", &self.0.user)
            .finish_non_exhaustive()
    }
}

impl Mechanism for OAuthBearer {
    fn name(&self) -> &'static str {
        "OAUTHBEARER"
    }

    fn supports_initial_response(&self) -> bool {
        true
    }

    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Vec<u8>> {
        // gs2 header: no channel binding, authzid = user; ',' and '='
        // in the name are escaped per RFC 5801.
        self.0.step(
            "OAUTHBEARER",
            challenge,
            |b| {
                let user = b.user.replace('=', "=3D").replace(',', "=2C");
                format!("n,a={user},\x01auth=Bearer {}\x01\x01", b.token)
            },
            b"\x01",
        )
    }

    fn authenticated_username(&self) -> &str {
        &self.0.user
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn xoauth2_format() {
        let mut m = XOAuth2::new("user@example.com", "ya29.token");
        assert_eq!(
            m.step(None).unwrap(),
            b"user=user@example.com\x01auth=Bearer ya29.token\x01\x01"
        );
    }

    #[test]
    fn oauthbearer_format() {
        let mut m = OAuthBearer::new("user@example.com", "tok");
        assert_eq!(
            m.step(None).unwrap(),
            b"n,a=user@example.com,\x01auth=Bearer tok\x01\x01"
        );
    }

    #[test]
    fn oauthbearer_escapes_gs2_name() {
        let mut m = OAuthBearer::new("a,b=c", "tok");
        let msg = m.step(None).unwrap();
        assert!(msg.starts_with(b"n,a=a=2Cb=3Dc,"));
    }

    #[test]
    fn error_challenge_is_acknowledged_once() {
        let mut m = XOAuth2::new("u", "t");
        m.step(None).unwrap();
        let detail = br#"{"status":"401","schemes":"bearer"}"#;
        assert_eq!(m.step(Some(detail)).unwrap(), b"");
        assert_eq!(m.error_detail(), Some(r#"{"status":"401","schemes":"bearer"}"#));
        assert!(m.step(Some(detail)).is_err());

        let mut m = OAuthBearer::new("u", "t");
        m.step(None).unwrap();
        assert_eq!(m.step(Some(b"{}")).unwrap(), b"\x01");
    }

    #[test]
    fn first_challenge_without_sasl_ir_gets_the_token() {
        let mut m = XOAuth2::new("u", "t");
        assert_eq!(m.step(Some(b"")).unwrap(), b"user=u\x01auth=Bearer t\x01\x01");
    }
}
