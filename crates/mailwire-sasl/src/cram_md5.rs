//! CRAM-MD5 (RFC 2195).

use hmac::{Hmac, Mac};

use crate::error::{Result, SaslError};
use crate::Mechanism;

type HmacMd5 = Hmac<md5::Md5>;

/// CRAM-MD5 mechanism: `username SP hex(HMAC-MD5(password, challenge))`.
pub struct CramMd5 {
    username: String,
    password: String,
    answered: bool,
}

impl CramMd5 {
    /// Creates a CRAM-MD5 exchange.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            answered: false,
        }
    }
}

impl std::fmt::Debug for CramMd5 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CramMd5")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Mechanism for CramMd5 {
    fn name(&self) -> &'static str {
        "CRAM-MD5"
    }

    fn supports_initial_response(&self) -> bool {
        false
    }

    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Vec<u8>> {
        let Some(challenge) = challenge else {
            return Err(SaslError::ChallengeRequired {
                mechanism: "CRAM-MD5",
            });
        };
        if self.answered {
            return Err(SaslError::UnexpectedChallenge {
                mechanism: "CRAM-MD5",
                steps: 1,
            });
        }
        if challenge.is_empty() {
            return Err(SaslError::MalformedChallenge(
                "CRAM-MD5 challenge is empty".to_string(),
            ));
        }

        let mut mac = HmacMd5::new_from_slice(self.password.as_bytes())
            .map_err(|e| SaslError::InvalidCredentials(e.to_string()))?;
        mac.update(challenge);
        let digest = mac.finalize().into_bytes();

        let mut response = format!("{} ", self.username);
        for byte in digest {
            response.push_str(&format!("{byte:02x}"));
        }
        self.answered = true;
        Ok(response.into_bytes())
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
    fn rfc2195_example() {
        let mut cram = CramMd5::new("tim", "tanstaaftanstaaf");
        let response = cram
            .step(Some(b"<1896.697170952@postoffice.reston.mci.net>"))
            .unwrap();
        assert_eq!(response, b"tim b913a602c7eda7a495b4e6e7334d3890");
    }

    #[test]
    fn needs_a_challenge() {
        let mut cram = CramMd5::new("tim", "pw");
        assert!(matches!(
            cram.step(None),
            Err(SaslError::ChallengeRequired { .. })
        ));
        assert!(matches!(
            cram.step(Some(b"")),
            Err(SaslError::MalformedChallenge(_))
        ));
    }

    #[test]
    fn answers_once() {
        let mut cram = CramMd5::new("tim", "pw");
        cram.step(Some(b"<1@host>")).unwrap();
        assert!(cram.step(Some(b"<2@host>")).is_err());
    }
}
