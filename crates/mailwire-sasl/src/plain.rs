//! PLAIN (RFC 4616).

use crate::error::{Result, SaslError};
use crate::Mechanism;

/// PLAIN mechanism: `authzid NUL authcid NUL password` in one step.
pub struct Plain {
    authzid: String,
    username: String,
    password: String,
    sent: bool,
}

impl Plain {
    /// Creates a PLAIN exchange with an empty authorization identity.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            authzid: String::new(),
            username: username.into(),
            password: password.into(),
            sent: false,
        }
    }

    /// Acts on behalf of `authzid` (proxy authentication).
    #[must_use]
    pub fn with_authzid(mut self, authzid: impl Into<String>) -> Self {
        self.authzid = authzid.into();
        self
    }

    fn message(&self) -> Result<Vec<u8>> {
        if [&self.authzid, &self.username, &self.password]
            .iter()
            .any(|s| s.contains('\0'))
        {
            return Err(SaslError::InvalidCredentials(
                "PLAIN credentials must not contain NUL".to_string(),
            ));
        }
        let mut out =
            Vec::with_capacity(self.authzid.len() + self.username.len() + self.password.len() + 2);
        out.extend_from_slice(self.authzid.as_bytes());
        out.push(0);
        out.extend_from_slice(self.username.as_bytes());
        out.push(0);
        out.extend_from_slice(self.password.as_bytes());
        Ok(out)
    }
}

impl std::fmt::Debug for Plain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plain")
            .field("authzid", &self.authzid)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Mechanism for Plain {
    fn name(&self) -> &'static str {
        "PLAIN"
    }

    fn supports_initial_response(&self) -> bool {
        true
    }

    /// Any first challenge is answered with the credentials.
    fn step(&mut self, _challenge: Option<&[u8]>) -> Result<Vec<u8>> {
        if self.sent {
            return Err(SaslError::UnexpectedChallenge {
                mechanism: "PLAIN",
                steps: 1,
            });
        }
        let message = self.message()?;
        self.sent = true;
        Ok(message)
    }

    fn authenticated_username(&self) -> &str {
        &self.username
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn initial_response_layout() {
        let mut plain = Plain::new("user@example.com", "password123");
        assert_eq!(plain.step(None).unwrap(), b"\0user@example.com\0password123");
    }

    #[test]
    fn authzid_goes_first() {
        let mut plain = Plain::new("admin", "pw").with_authzid("bob");
        assert_eq!(plain.step(Some(b"")).unwrap(), b"bob\0admin\0pw");
    }

    #[test]
    fn second_challenge_is_an_error() {
        let mut plain = Plain::new("bob", "pw");
        plain.step(Some(b"OK")).unwrap();
        assert!(matches!(
            plain.step(Some(b"again")),
            Err(SaslError::UnexpectedChallenge { .. })
        ));
    }

    #[test]
    fn nul_in_password_is_rejected() {
        let mut plain = Plain::new("bob", "p\0w");
        assert!(matches!(
            plain.step(None),
            Err(SaslError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn debug_hides_password() {
        let plain = Plain::new("bob", "hunter2");
        assert!(!format!("{plain:?}").contains("hunter2"));
    }
}
