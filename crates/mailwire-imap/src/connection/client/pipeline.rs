//! Command execution: one command in flight, continuations, completions.
//!
//! A command runs as a single sequential routine. The first wire part is
//! written, then responses are read one at a time:
//!
//! - untagged data updates the connection state, then goes to the
//!   connection handler, then to the command's own callback;
//! - a `+` continuation releases the next literal part, or, when none is
//!   left, is passed to the command's continuation callback (SASL);
//! - the tagged completion ends the command.

use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use super::Client;
use crate::command::{Command, Request};
use crate::connection::state::Phase;
use crate::connection::stream::Transport;
use crate::handler;
use crate::parser::{Completion, Response, ResponseParser, UntaggedResponse};
use crate::types::{SelectedFolder, Status, Tag};
use crate::{Error, Result};

/// Per-command sink for untagged responses.
pub(crate) type UntaggedSink<'a> = &'a mut (dyn FnMut(&UntaggedResponse) + Send);

/// Answers a continuation that no pending literal accounts for. `Ok(None)`
/// means the command expected none.
pub(crate) type ContinuationSink<'a> =
    &'a mut (dyn FnMut(Option<&str>) -> Result<Option<Vec<u8>>> + Send);

/// Connection phase a command requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Any,
    NotAuthenticated,
    Authenticated,
    /// Authenticated with no folder selected.
    AuthenticatedOnly,
    Selected,
}

impl Access {
    pub(crate) const fn of(command: &Command) -> Self {
        match command {
            Command::Capability | Command::Noop | Command::Logout => Self::Any,
            Command::StartTls | Command::Login { .. } | Command::Authenticate { .. } => {
                Self::NotAuthenticated
            }
            Command::Check
            | Command::Close
            | Command::Unselect
            | Command::Expunge
            | Command::UidExpunge { .. }
            | Command::Search { .. }
            | Command::Fetch { .. }
            | Command::Store { .. }
            | Command::Copy { .. }
            | Command::Move { .. }
            | Command::Idle => Self::Selected,
            Command::Enable { .. } => Self::AuthenticatedOnly,
            _ => Self::Authenticated,
        }
    }
}

/// What ended a wait for the server.
#[derive(Debug)]
pub(crate) enum Step {
    /// `+` continuation request.
    Continue(Option<String>),
    /// Tagged completion.
    Done(Completion),
}

fn no_continuation(_: Option<&str>) -> Result<Option<Vec<u8>>> {
    Ok(None)
}

impl<S: Transport> Client<S> {
    /// Runs an arbitrary command, passing each untagged response to
    /// `on_untagged` in arrival order.
    ///
    /// Returns the tagged completion on OK. NO and BAD become
    /// [`Error::No`] and [`Error::Bad`]. Folder and identity bookkeeping for
    /// SELECT, EXAMINE, LOGIN, CLOSE, UNSELECT and LOGOUT applies as with
    /// the dedicated methods. IDLE, STARTTLS and AUTHENTICATE need their
    /// own methods.
    pub async fn execute<F>(&mut self, command: Command, mut on_untagged: F) -> Result<Completion>
    where
        F: FnMut(&UntaggedResponse) + Send,
    {
        if matches!(
            command,
            Command::Idle | Command::StartTls | Command::Authenticate { .. }
        ) {
            return Err(Error::Precondition(format!(
                "{} has a dedicated method",
                command.verb()
            )));
        }
        let completion = self.run(&command, &mut on_untagged).await?;
        match &command {
            Command::Login { username, .. } => self.state.authenticate(username, "LOGIN"),
            Command::Logout => {
                self.state.reset();
                self.tags.reset();
                self.operation.dispose();
            }
            _ => {}
        }
        Ok(completion)
    }

    /// Fails unless a command needing `access` may be sent now.
    pub(crate) fn guard(&self, access: Access) -> Result<()> {
        self.operation.ensure_ready()?;
        match (access, self.state.phase()) {
            (Access::Any, _)
            | (Access::NotAuthenticated, Phase::NotAuthenticated)
            | (Access::Authenticated, Phase::Authenticated | Phase::Selected)
            | (Access::AuthenticatedOnly, Phase::Authenticated)
            | (Access::Selected, Phase::Selected) => Ok(()),
            (Access::NotAuthenticated, _) => {
                Err(Error::Precondition("already authenticated".to_string()))
            }
            (
                Access::Authenticated | Access::AuthenticatedOnly | Access::Selected,
                Phase::NotAuthenticated,
            ) => Err(Error::Precondition("not authenticated".to_string())),
            (Access::AuthenticatedOnly, Phase::Selected) => Err(Error::Precondition(
                "must not have a folder selected".to_string(),
            )),
            (Access::Selected, _)
            | (Access::Authenticated | Access::AuthenticatedOnly, Phase::Closed) => {
                Err(Error::Precondition("no folder selected".to_string()))
            }
        }
    }

    /// Checks the gate and encodes the command under a fresh tag.
    pub(crate) fn prepare(&self, command: &Command) -> Result<Request> {
        self.guard(Access::of(command))?;
        Ok(command.serialize(&self.tags.next()))
    }

    /// Runs a command that needs no continuation answers, with the state
    /// bookkeeping of SELECT, EXAMINE, CLOSE and UNSELECT.
    pub(crate) async fn run(
        &mut self,
        command: &Command,
        on_untagged: UntaggedSink<'_>,
    ) -> Result<Completion> {
        let request = self.prepare(command)?;

        match command {
            Command::Select { mailbox } => {
                self.state
                    .begin_select(SelectedFolder::new(mailbox.clone(), false));
            }
            Command::Examine { mailbox } => {
                self.state
                    .begin_select(SelectedFolder::new(mailbox.clone(), true));
            }
            _ => {}
        }

        let outcome = self
            .execute_with(&request, on_untagged, &mut no_continuation)
            .await;

        match (command, &outcome) {
            (Command::Select { .. } | Command::Examine { .. }, Err(_))
            | (Command::Close | Command::Unselect, Ok(_)) => self.state.deselect(),
            (Command::Select { mailbox } | Command::Examine { mailbox }, Ok(_)) => {
                debug!(folder = %mailbox, "selected");
            }
            _ => {}
        }
        outcome
    }

    /// Runs an encoded request to its completion.
    pub(crate) async fn execute_with(
        &mut self,
        request: &Request,
        on_untagged: UntaggedSink<'_>,
        on_continue: ContinuationSink<'_>,
    ) -> Result<Completion> {
        self.operation.begin(request.tag())?;
        let outcome = self.drive(request, on_untagged, on_continue).await;
        self.settle(outcome)
    }

    /// Frees the command slot, or poisons it after a fatal error. An
    /// untagged BYE closes the connection for good.
    pub(crate) fn settle<T>(&mut self, outcome: Result<T>) -> Result<T> {
        match &outcome {
            Err(e) if e.is_fatal() => self.operation.poison(e.to_string()),
            _ => self.operation.finish(),
        }
        if self.state.bye().is_some() {
            self.operation.dispose();
        }
        outcome
    }

    async fn drive(
        &mut self,
        request: &Request,
        on_untagged: UntaggedSink<'_>,
        on_continue: ContinuationSink<'_>,
    ) -> Result<Completion> {
        debug!(tag = %request.tag(), "C: {}", request.log_line());

        let mut parts = request.parts().iter();
        if let Some(first) = parts.next() {
            self.send_part(first).await?;
        }

        loop {
            match self.await_step(on_untagged).await? {
                Step::Continue(text) => {
                    if let Some(part) = parts.next() {
                        self.send_part(part).await?;
                    } else if let Some(reply) = on_continue(text.as_deref())? {
                        self.send_line(&reply).await?;
                    } else {
                        return Err(Error::Protocol(format!(
                            "unexpected continuation request during {}",
                            request.verb()
                        )));
                    }
                }
                Step::Done(completion) => return self.complete(request.tag(), completion),
            }
        }
    }

    /// Checks a completion against the outstanding tag and applies its
    /// response code. NO and BAD become errors.
    pub(crate) fn complete(&mut self, tag: &Tag, completion: Completion) -> Result<Completion> {
        if !tag.matches(completion.tag.as_str()) {
            return Err(Error::Protocol(format!(
                "completion for unknown tag {} while waiting for {tag}",
                completion.tag
            )));
        }
        self.state.apply_completion(&completion);
        handler::dispatch_completion(self.handler.as_mut(), &completion);
        debug!(%tag, status = completion.status.as_str(), "completed");

        match completion.status {
            Status::Ok => Ok(completion),
            Status::No => Err(Error::No {
                text: completion.text,
                code: completion.code,
            }),
            Status::Bad => Err(Error::Bad {
                text: completion.text,
                code: completion.code,
            }),
            Status::PreAuth | Status::Bye => Err(Error::Protocol(format!(
                "tagged {} is not a completion",
                completion.status.as_str()
            ))),
        }
    }

    /// Reads until a continuation or a tagged completion, delivering every
    /// untagged response on the way.
    pub(crate) async fn await_step(&mut self, on_untagged: UntaggedSink<'_>) -> Result<Step> {
        let limit = self.io_timeout;
        loop {
            let raw = self.read_raw(limit).await?.ok_or(Error::Timeout(limit))?;
            match ResponseParser::parse(&raw)? {
                Response::Untagged(untagged) => self.deliver(&untagged, on_untagged),
                Response::Continuation { text } => return Ok(Step::Continue(text)),
                Response::Tagged(completion) => return Ok(Step::Done(completion)),
            }
        }
    }

    /// State first, then the connection handler, then the command.
    pub(crate) fn deliver(&mut self, untagged: &UntaggedResponse, on_untagged: UntaggedSink<'_>) {
        self.state.apply(untagged);
        handler::dispatch(self.handler.as_mut(), untagged);
        on_untagged(untagged);
    }

    /// Reads one response within `limit`; `None` if the time ran out.
    ///
    /// End of stream after an untagged BYE is reported as [`Error::Bye`].
    pub(crate) async fn read_raw(&mut self, limit: Duration) -> Result<Option<Vec<u8>>> {
        match timeout(limit, self.stream.read_response()).await {
            Err(_) => Ok(None),
            Ok(Ok(raw)) => Ok(Some(raw)),
            Ok(Err(Error::Io(e))) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(self
                    .state
                    .bye()
                    .map_or(Error::Io(e), |text| Error::Bye(text.to_string())))
            }
            Ok(Err(e)) => Err(e),
        }
    }

    pub(crate) async fn send_part(&mut self, part: &[u8]) -> Result<()> {
        let limit = self.io_timeout;
        timeout(limit, self.stream.write_all(part))
            .await
            .map_err(|_| Error::Timeout(limit))?
    }

    /// Writes part of a streamed literal without flushing.
    pub(crate) async fn send_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let limit = self.io_timeout;
        timeout(limit, self.stream.write_chunk(chunk))
            .await
            .map_err(|_| Error::Timeout(limit))?
    }

    /// Writes a continuation answer followed by its line terminator.
    pub(crate) async fn send_line(&mut self, line: &[u8]) -> Result<()> {
        let limit = self.io_timeout;
        let stream = &mut self.stream;
        timeout(limit, async move {
            stream.write_chunk(line).await?;
            stream.write_all(b"\r\n").await
        })
        .await
        .map_err(|_| Error::Timeout(limit))?
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
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::types::{Capability, Mailbox};

    async fn client(mock: Mock) -> Client<Mock> {
        Client::from_stream(mock).await.unwrap()
    }

    #[tokio::test]
    async fn greeting_seeds_capabilities() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 IDLE] Dovecot ready.\r\n")
            .build();
        let client = client(mock).await;
        assert_eq!(client.greeting(), Some("Dovecot ready."));
        assert_eq!(client.capabilities(), &[Capability::Imap4Rev1, Capability::Idle]);
        assert_eq!(client.phase(), Phase::NotAuthenticated);
    }

    #[tokio::test]
    async fn preauth_greeting_authenticates() {
        let mock = Builder::new().read(b"* PREAUTH welcome back\r\n").build();
        let client = client(mock).await;
        assert_eq!(client.phase(), Phase::Authenticated);
        assert_eq!(client.identity().unwrap().mechanism, "PREAUTH");
    }

    #[tokio::test]
    async fn bye_greeting_fails() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Bye(ref t) if t == "too many connections"));
    }

    #[tokio::test]
    async fn tags_count_up_from_one() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 NOOP\r\n")
            .read(b"00001 OK done\r\n")
            .write(b"00002 NOOP\r\n")
            .read(b"00002 OK done\r\n")
            .build();
        let mut client = client(mock).await;
        client.noop().await.unwrap();
        client.noop().await.unwrap();
        assert_eq!(client.commands_issued(), 2);
    }

    #[tokio::test]
    async fn untagged_data_reaches_callback_in_order() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* XUNKNOWN stuff\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" Sent\r\n")
            .read(b"00001 OK LIST completed\r\n")
            .build();
        let mut client = client(mock).await;

        let mut seen = Vec::new();
        client
            .execute(
                Command::List {
                    reference: String::new(),
                    pattern: "*".to_string(),
                },
                |u| seen.push(u.clone()),
            )
            .await
            .unwrap();

        assert_eq!(seen.len(), 3);
        assert!(matches!(&seen[0], UntaggedResponse::List(l) if l.mailbox == Mailbox::inbox()));
        assert!(matches!(&seen[1], UntaggedResponse::Unknown { keyword, .. } if keyword == "XUNKNOWN"));
        assert!(matches!(&seen[2], UntaggedResponse::List(l) if l.mailbox.as_str() == "Sent"));
    }

    #[tokio::test]
    async fn server_rejection_keeps_connection_usable() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 CREATE INBOX\r\n")
            .read(b"00001 NO [ALREADYEXISTS] Mailbox exists\r\n")
            .write(b"00002 NOOP\r\n")
            .read(b"00002 OK\r\n")
            .build();
        let mut client = client(mock).await;

        let err = client.create("INBOX").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ServerRejection);
        assert!(matches!(
            err.code(),
            Some(crate::types::ResponseCode::Unknown(c)) if c == "ALREADYEXISTS"
        ));
        client.noop().await.unwrap();
    }

    #[tokio::test]
    async fn tag_mismatch_poisons_connection() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 NOOP\r\n")
            .read(b"A999 OK done\r\n")
            .build();
        let mut client = client(mock).await;

        let err = client.noop().await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ProtocolError);
        assert_eq!(client.phase(), Phase::Closed);

        let err = client.noop().await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn shorter_numeric_tag_still_matches() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 NOOP\r\n")
            .read(b"0001 OK done\r\n")
            .build();
        let mut client = client(mock).await;
        client.noop().await.unwrap();
    }

    #[tokio::test]
    async fn eof_after_bye_reports_bye() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 NOOP\r\n")
            .read(b"* BYE server shutting down\r\n")
            .build();
        let mut client = client(mock).await;

        let err = client.noop().await.unwrap_err();
        assert!(matches!(err, Error::Bye(ref t) if t == "server shutting down"));
        assert_eq!(client.phase(), Phase::Closed);
    }

    #[tokio::test]
    async fn literal_parts_wait_for_continuation() {
        let name = "f\u{fc}r";
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 CREATE {4}\r\n")
            .read(b"+ go ahead\r\n")
            .write("f\u{fc}r\r\n".as_bytes())
            .read(b"00001 OK created\r\n")
            .build();
        let mut client = client(mock).await;
        client.create(name).await.unwrap();
    }

    #[tokio::test]
    async fn unexpected_continuation_is_protocol_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 NOOP\r\n")
            .read(b"+ what\r\n")
            .build();
        let mut client = client(mock).await;
        let err = client.noop().await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ProtocolError);
    }

    #[tokio::test]
    async fn generic_execute_refuses_stateful_verbs() {
        let mock = Builder::new().read(b"* PREAUTH ready\r\n").build();
        let mut client = client(mock).await;
        let err = client.execute(Command::Idle, |_| {}).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(client.commands_issued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_times_out() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"00001 NOOP\r\n")
            .wait(Duration::from_secs(3600))
            .build();
        let mut client = client(mock).await;
        let err = client.noop().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(client.phase(), Phase::Closed);
    }
}
