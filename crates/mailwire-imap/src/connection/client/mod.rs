//! The IMAP client connection.
//!
//! One [`Client`] owns one transport and the state of the session on it.
//! Which commands are legal depends on the runtime [`Phase`]:
//!
//! - `NotAuthenticated`: after the greeting
//! - `Authenticated`: after LOGIN, AUTHENTICATE or a PREAUTH greeting
//! - `Selected`: after a successful SELECT or EXAMINE
//!
//! Every command checks the phase, the IDLE marker, and the command slot
//! before anything is written, and fails with [`Error::Precondition`]
//! otherwise.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod extensions;
mod not_authenticated;
mod pipeline;
mod selected;

use std::time::Duration;

use tracing::debug;

use super::config::{Config, DEFAULT_MAX_LINE_LENGTH, DEFAULT_MAX_LITERAL_SIZE, Security};
use super::framed::FramedStream;
use super::operation::Operation;
use super::state::{ConnectionState, Identity, Phase};
use super::stream::{ImapStream, Transport, connect_plain, connect_tls};
use crate::command::TagGenerator;
use crate::handler::{NoopHandler, ResponseHandler};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, SelectedFolder, Status};
use crate::{Error, Result};

pub(crate) use pipeline::Step;
pub use selected::FetchedMessage;

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// IMAP client connection.
pub struct Client<S> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tags: TagGenerator,
    pub(crate) state: ConnectionState,
    pub(crate) operation: Operation,
    pub(crate) handler: Box<dyn ResponseHandler>,
    pub(crate) io_timeout: Duration,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tags", &self.tags)
            .field("state", &self.state)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

impl Client<ImapStream> {
    /// Opens a connection as described by `config` and reads the greeting.
    ///
    /// With [`Security::StartTls`] the connection is upgraded before this
    /// returns; the capability cache is then empty until
    /// [`capability`](Self::capability) is called.
    pub async fn connect(config: &Config) -> Result<Self> {
        let stream = match config.security {
            Security::Implicit => {
                connect_tls(&config.host, config.port, config.connect_timeout).await?
            }
            Security::None | Security::StartTls => {
                connect_plain(&config.host, config.port, config.connect_timeout).await?
            }
        };
        debug!(host = %config.host, port = config.port, security = ?config.security, "connected");

        let mut client = Self::from_stream_with_config(stream, config).await?;
        if config.security == Security::StartTls {
            client.starttls(&config.host).await?;
        }
        Ok(client)
    }
}

impl<S: Transport> Client<S> {
    /// Creates a client over a connected transport and reads the greeting.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let framed =
            FramedStream::with_limits(stream, DEFAULT_MAX_LINE_LENGTH, DEFAULT_MAX_LITERAL_SIZE);
        Self::start(framed, DEFAULT_IO_TIMEOUT).await
    }

    /// Like [`from_stream`](Self::from_stream), taking timeouts and framing
    /// limits from `config`.
    pub async fn from_stream_with_config(stream: S, config: &Config) -> Result<Self> {
        let framed =
            FramedStream::with_limits(stream, config.max_line_length, config.max_literal_size);
        Self::start(framed, config.io_timeout).await
    }

    async fn start(stream: FramedStream<S>, io_timeout: Duration) -> Result<Self> {
        let mut client = Self {
            stream,
            tags: TagGenerator::new(),
            state: ConnectionState::new(),
            operation: Operation::Ready,
            handler: Box::new(NoopHandler),
            io_timeout,
        };

        let raw = client
            .read_raw(io_timeout)
            .await?
            .ok_or(Error::Timeout(io_timeout))?;
        let Response::Untagged(greeting) = ResponseParser::parse(&raw)? else {
            return Err(Error::Protocol("greeting is not an untagged response".to_string()));
        };
        client.state.apply(&greeting);

        match greeting {
            UntaggedResponse::Condition {
                status: Status::Ok,
                text,
                ..
            } => client.state.set_greeting(text),
            UntaggedResponse::Condition {
                status: Status::PreAuth,
                text,
                ..
            } => {
                client.state.set_greeting(text);
                client.state.authenticate("", "PREAUTH");
            }
            UntaggedResponse::Condition {
                status: Status::Bye,
                text,
                ..
            } => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        debug!(greeting = ?client.state.greeting(), "greeting received");
        Ok(client)
    }

    /// Installs the handler for unsolicited responses.
    pub fn set_handler(&mut self, handler: impl ResponseHandler + 'static) {
        self.handler = Box::new(handler);
    }

    /// Returns the cached server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        self.state.capabilities()
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.state.capabilities().contains(cap)
    }

    /// Returns true if the server supports IDLE (RFC 2177).
    #[must_use]
    pub fn supports_idle(&self) -> bool {
        self.has_capability(&Capability::Idle)
    }

    /// Returns true if the server supports MOVE (RFC 6851).
    #[must_use]
    pub fn supports_move(&self) -> bool {
        self.has_capability(&Capability::Move)
    }

    /// Returns true if the server supports UIDPLUS (RFC 4315).
    #[must_use]
    pub fn supports_uidplus(&self) -> bool {
        self.has_capability(&Capability::UidPlus)
    }

    /// Returns true if the server accepts an initial response on
    /// AUTHENTICATE (RFC 4959).
    #[must_use]
    pub fn supports_sasl_ir(&self) -> bool {
        self.has_capability(&Capability::SaslIr)
    }

    /// Returns true if the server advertises `AUTH=<mechanism>`.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.state.capabilities().iter().any(|c| c.is_auth(mechanism))
    }

    /// Returns true if LOGIN is disabled (e.g., before STARTTLS).
    #[must_use]
    pub fn login_disabled(&self) -> bool {
        self.has_capability(&Capability::LoginDisabled)
    }

    /// Greeting text sent by the server.
    #[must_use]
    pub fn greeting(&self) -> Option<&str> {
        self.state.greeting()
    }

    /// The selected folder, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<&SelectedFolder> {
        self.state.selected()
    }

    /// Who the connection is authenticated as.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.state.identity()
    }

    /// Returns true while IDLE runs.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.operation.idle_tag().is_some()
    }

    /// Returns true if the transport is encrypted.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.stream.get_ref().is_secure()
    }

    /// Current connection phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        if self.operation.is_usable() {
            self.state.phase()
        } else {
            Phase::Closed
        }
    }

    /// Number of tags issued on this connection since the last reset.
    #[must_use]
    pub fn commands_issued(&self) -> u64 {
        self.tags.issued()
    }

    /// Sends CAPABILITY and returns the refreshed capability set.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        self.run(&crate::Command::Capability, &mut |_| {}).await?;
        Ok(self.state.capabilities().to_vec())
    }

    /// Sends NOOP, which also collects pending unsolicited updates.
    pub async fn noop(&mut self) -> Result<()> {
        self.run(&crate::Command::Noop, &mut |_| {}).await?;
        Ok(())
    }

    /// Logs out and resets all connection state.
    ///
    /// Unless the command could not be sent at all, the client is closed
    /// afterwards, whether or not the server answered.
    pub async fn logout(&mut self) -> Result<()> {
        let outcome = self.run(&crate::Command::Logout, &mut |_| {}).await;
        if let Err(Error::Precondition(_)) = outcome {
            return outcome.map(|_| ());
        }
        self.state.reset();
        self.tags.reset();
        self.operation.dispose();
        let _ = tokio::io::AsyncWriteExt::shutdown(self.stream.get_mut()).await;
        debug!("logged out");
        outcome.map(|_| ())
    }
}
