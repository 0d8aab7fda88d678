//! Commands of the not-authenticated state: LOGIN, AUTHENTICATE, STARTTLS.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mailwire_sasl::{Mechanism, SaslError};
use tracing::{debug, warn};

use super::Client;
use super::pipeline::Access;
use crate::command::Command;
use crate::connection::stream::Transport;
use crate::{Error, Result};

/// Turns a server rejection of credentials into [`Error::Auth`].
fn credential_rejection(err: Error) -> Error {
    match err {
        Error::No { text, code } | Error::Bad { text, code } => Error::Auth { text, code },
        other => other,
    }
}

impl<S: Transport> Client<S> {
    /// Authenticates with LOGIN.
    ///
    /// The password is masked in logs. Servers advertising `LOGINDISABLED`
    /// answer with NO; that is reported as [`Error::Auth`].
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.run(&command, &mut |_| {})
            .await
            .map_err(credential_rejection)?;
        self.state.authenticate(username, "LOGIN");
        Ok(())
    }

    /// Authenticates with a SASL mechanism.
    ///
    /// The initial response goes on the command line when the mechanism
    /// has one and the server advertises `SASL-IR`. Each `+` challenge is
    /// base64-decoded, passed to the mechanism, and its answer sent back
    /// base64-encoded. If the mechanism fails, the exchange is cancelled
    /// with `*` and its error returned.
    pub async fn authenticate(&mut self, mechanism: &mut dyn Mechanism) -> Result<()> {
        self.guard(Access::NotAuthenticated)?;

        let initial_response =
            if mechanism.supports_initial_response() && self.supports_sasl_ir() {
                let bytes = mechanism.step(None)?;
                Some(if bytes.is_empty() {
                    "=".to_string()
                } else {
                    STANDARD.encode(bytes)
                })
            } else {
                None
            };

        let name = mechanism.name();
        let request = self.prepare(&Command::Authenticate {
            mechanism: name.to_string(),
            initial_response,
        })?;

        let mut failure: Option<SaslError> = None;
        let outcome = {
            let mut on_continue = |text: Option<&str>| -> Result<Option<Vec<u8>>> {
                let challenge = decode_challenge(text.unwrap_or_default());
                match mechanism.step(Some(&challenge)) {
                    Ok(response) => Ok(Some(STANDARD.encode(response).into_bytes())),
                    Err(e) => {
                        warn!(mechanism = name, error = %e, "cancelling authentication");
                        failure = Some(e);
                        Ok(Some(b"*".to_vec()))
                    }
                }
            };
            self.execute_with(&request, &mut |_| {}, &mut on_continue)
                .await
        };

        if let Some(e) = failure {
            return Err(Error::Sasl(e));
        }
        outcome.map_err(credential_rejection)?;

        let username = mechanism.authenticated_username().to_string();
        self.state.authenticate(&username, name);
        Ok(())
    }

    /// Upgrades the connection to TLS with STARTTLS.
    ///
    /// Any bytes that arrived after the tagged OK and before the handshake
    /// would have been injected in plaintext; their presence is a protocol
    /// error. The capability cache is emptied afterwards, so
    /// [`capability`](Self::capability) must be called again.
    pub async fn starttls(&mut self, host: &str) -> Result<()> {
        if self.is_secure() {
            return Err(Error::Precondition("connection is already encrypted".to_string()));
        }
        self.run(&Command::StartTls, &mut |_| {}).await?;

        if self.stream.has_buffered_data() {
            let err = Error::Protocol("data received after STARTTLS before handshake".to_string());
            self.operation.poison(err.to_string());
            return Err(err);
        }
        if let Err(e) = self.stream.get_mut().upgrade_to_tls(host).await {
            self.operation.poison(e.to_string());
            return Err(e);
        }

        self.state.clear_capabilities();
        debug!(host, "TLS established");
        Ok(())
    }
}

/// Decodes a SASL challenge. Text that is not base64 (some servers send
/// `+ OK` or a bare prompt) is passed through as raw bytes.
fn decode_challenge(text: &str) -> Vec<u8> {
    let text = text.trim();
    match STANDARD.decode(text) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "challenge is not base64, passing it through");
            text.as_bytes().to_vec()
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use mailwire_sasl::{CramMd5, Login, Plain, XOAuth2};
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::connection::state::Phase;
    use crate::types::ResponseCode;
    use crate::ErrorKind;

    async fn client(mock: Mock) -> Client<Mock> {
        Client::from_stream(mock).await.unwrap()
    }

    #[tokio::test]
    async fn login_records_identity() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 LOGIN bob secret\r\n")
            .read(b"00001 OK [CAPABILITY IMAP4rev1 IDLE] Logged in\r\n")
            .build();
        let mut client = client(mock).await;
        client.login("bob", "secret").await.unwrap();

        let identity = client.identity().unwrap();
        assert_eq!(identity.username, "bob");
        assert_eq!(identity.mechanism, "LOGIN");
        assert_eq!(client.phase(), Phase::Authenticated);
        assert!(client.supports_idle());
    }

    #[tokio::test]
    async fn tagged_alert_reaches_handler() {
        use std::sync::{Arc, Mutex};

        use crate::handler::{CollectingHandler, UnsolicitedEvent};

        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 LOGIN bob secret\r\n")
            .read(b"00001 OK [ALERT] Mailbox is 95% full\r\n")
            .build();
        let mut client = client(mock).await;
        let shared = Arc::new(Mutex::new(CollectingHandler::new()));
        client.set_handler(Arc::clone(&shared));

        client.login("bob", "secret").await.unwrap();
        assert_eq!(
            shared.lock().unwrap().take(),
            vec![UnsolicitedEvent::Alert("Mailbox is 95% full".to_string())]
        );
    }

    #[tokio::test]
    async fn rejected_login_is_auth_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 LOGIN bob wrong\r\n")
            .read(b"00001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();
        let mut client = client(mock).await;
        let err = client.login("bob", "wrong").await.unwrap_err();
        assert!(matches!(
            &err,
            Error::Auth { code: Some(ResponseCode::Unknown(c)), .. } if c == "AUTHENTICATIONFAILED"
        ));
        assert_eq!(err.kind(), ErrorKind::ServerRejection);
        assert_eq!(client.phase(), Phase::NotAuthenticated);
        assert!(client.identity().is_none());
    }

    #[tokio::test]
    async fn login_twice_is_refused_without_io() {
        let mock = Builder::new().read(b"* PREAUTH ready\r\n").build();
        let mut client = client(mock).await;
        let err = client.login("bob", "secret").await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(client.commands_issued(), 0);
    }

    #[tokio::test]
    async fn plain_with_sasl_ir() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=PLAIN] ready\r\n")
            .write(b"00001 AUTHENTICATE PLAIN AGJvYgBzZWNyZXQ=\r\n")
            .read(b"00001 OK authenticated\r\n")
            .build();
        let mut client = client(mock).await;
        client
            .authenticate(&mut Plain::new("bob", "secret"))
            .await
            .unwrap();
        assert_eq!(client.identity().unwrap().mechanism, "PLAIN");
    }

    #[tokio::test]
    async fn plain_without_sasl_ir_waits_for_challenge() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready\r\n")
            .write(b"00001 AUTHENTICATE PLAIN\r\n")
            .read(b"+ \r\n")
            .write(b"AGJvYgBzZWNyZXQ=")
            .write(b"\r\n")
            .read(b"00001 OK authenticated\r\n")
            .build();
        let mut client = client(mock).await;
        client
            .authenticate(&mut Plain::new("bob", "secret"))
            .await
            .unwrap();
        assert_eq!(client.identity().unwrap().username, "bob");
    }

    #[tokio::test]
    async fn login_mechanism_two_round_trips() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 AUTHENTICATE LOGIN\r\n")
            .read(b"+ VXNlcm5hbWU6\r\n")
            .write(b"Ym9i")
            .write(b"\r\n")
            .read(b"+ UGFzc3dvcmQ6\r\n")
            .write(b"c2VjcmV0")
            .write(b"\r\n")
            .read(b"00001 OK welcome\r\n")
            .build();
        let mut client = client(mock).await;
        client
            .authenticate(&mut Login::new("bob", "secret"))
            .await
            .unwrap();
        assert_eq!(client.identity().unwrap().mechanism, "LOGIN");
    }

    #[tokio::test]
    async fn cram_md5_decodes_challenge() {
        // PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+ is the
        // RFC 2195 challenge.
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 AUTHENTICATE CRAM-MD5\r\n")
            .read(b"+ PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+\r\n")
            .write(b"dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw")
            .write(b"\r\n")
            .read(b"00001 OK CRAM-MD5 authentication successful\r\n")
            .build();
        let mut client = client(mock).await;
        client
            .authenticate(&mut CramMd5::new("tim", "tanstaaftanstaaf"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn mechanism_failure_cancels_exchange() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 AUTHENTICATE CRAM-MD5\r\n")
            .read(b"+ \r\n")
            .write(b"*")
            .write(b"\r\n")
            .read(b"00001 BAD AUTHENTICATE cancelled\r\n")
            .write(b"00002 NOOP\r\n")
            .read(b"00002 OK\r\n")
            .build();
        let mut client = client(mock).await;
        let err = client
            .authenticate(&mut CramMd5::new("tim", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sasl(SaslError::MalformedChallenge(_))));
        assert!(client.identity().is_none());
        client.noop().await.unwrap();
    }

    #[tokio::test]
    async fn refused_token_is_auth_error() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2] ready\r\n")
            .write(b"00001 AUTHENTICATE XOAUTH2 dXNlcj11AWF1dGg9QmVhcmVyIHQBAQ==\r\n")
            .read(b"+ eyJzdGF0dXMiOiI0MDEifQ==\r\n")
            .write(b"\r\n")
            .read(b"00001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();
        let mut client = client(mock).await;
        let mut xoauth = XOAuth2::new("u", "t");
        let err = client.authenticate(&mut xoauth).await.unwrap_err();
        assert!(matches!(err, Error::Auth { .. }));
        assert_eq!(xoauth.error_detail(), Some(r#"{"status":"401"}"#));
    }

    #[test]
    fn non_base64_challenge_passes_through() {
        assert_eq!(decode_challenge("OK"), b"OK");
        assert_eq!(decode_challenge("VXNlcm5hbWU6"), b"Username:");
        assert_eq!(decode_challenge(""), b"");
    }

    #[tokio::test]
    async fn starttls_clears_capabilities() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED] ready\r\n")
            .write(b"00001 STARTTLS\r\n")
            .read(b"00001 OK Begin TLS negotiation now\r\n")
            .build();
        let mut client = client(mock).await;
        assert!(client.login_disabled());
        client.starttls("imap.example.com").await.unwrap();
        assert!(client.capabilities().is_empty());
    }

    #[tokio::test]
    async fn starttls_after_login_is_refused() {
        let mock = Builder::new().read(b"* PREAUTH ready\r\n").build();
        let mut client = client(mock).await;
        let err = client.starttls("imap.example.com").await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }
}
