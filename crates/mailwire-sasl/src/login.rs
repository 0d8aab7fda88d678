//! LOGIN: username, then password, each in answer to a prompt.

use crate::error::{Result, SaslError};
use crate::Mechanism;

/// LOGIN mechanism.
///
/// Servers prompt with `Username:` and `Password:`. The prompts are
/// informational; the answers follow the order of the challenges.
pub struct Login {
    username: String,
    password: String,
    steps: usize,
}

impl Login {
    /// Creates a LOGIN exchange.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            steps: 0,
        }
    }
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("username", &self.username)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl Mechanism for Login {
    fn name(&self) -> &'static str {
        "LOGIN"
    }

    fn supports_initial_response(&self) -> bool {
        false
    }

    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Vec<u8>> {
        if challenge.is_none() {
            return Err(SaslError::ChallengeRequired { mechanism: "LOGIN" });
        }
        let response = match self.steps {
            0 => self.username.as_bytes().to_vec(),
            1 => self.password.as_bytes().to_vec(),
            steps => {
                return Err(SaslError::UnexpectedChallenge {
                    mechanism: "LOGIN",
                    steps,
                });
            }
        };
        self.steps += 1;
        Ok(response)
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
    fn answers_prompts_in_order() {
        let mut login = Login::new("bob", "secret");
        assert_eq!(login.step(Some(b"Username:")).unwrap(), b"bob");
        assert_eq!(login.step(Some(b"Password:")).unwrap(), b"secret");
        assert!(login.step(Some(b"?")).is_err());
    }

    #[test]
    fn no_initial_response() {
        let mut login = Login::new("bob", "secret");
        assert!(!login.supports_initial_response());
        assert!(matches!(
            login.step(None),
            Err(SaslError::ChallengeRequired { .. })
        ));
    }
}
