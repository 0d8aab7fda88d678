//! IMAP IDLE command support (RFC 2177).
//!
//! IDLE allows the client to receive real-time notifications from the server
//! about mailbox changes without polling. While it runs, the only thing the
//! client may send is `DONE`; every other command fails with
//! [`Error::Precondition`] before touching the wire.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use tracing::debug;

use super::client::{Client, Step};
use super::stream::Transport;
use crate::command::{Command, Request};
use crate::parser::{Completion, FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::{Flags, SeqNum, Tag};
use crate::{Error, Result};

/// Event received during IDLE.
#[derive(Debug, Clone, PartialEq)]
pub enum IdleEvent {
    /// New message count (EXISTS response).
    Exists(u32),
    /// Message expunged (EXPUNGE response).
    Expunge(SeqNum),
    /// Message flags changed (FETCH response).
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Updated flags.
        flags: Flags,
    },
    /// Recent count changed.
    Recent(u32),
    /// Any other untagged response.
    Other(Box<UntaggedResponse>),
    /// The server ended IDLE with a tagged OK.
    Terminated,
    /// Timeout occurred without receiving an event.
    Timeout,
}

impl IdleEvent {
    fn from_untagged(untagged: UntaggedResponse) -> Self {
        match untagged {
            UntaggedResponse::Exists(n) => Self::Exists(n),
            UntaggedResponse::Recent(n) => Self::Recent(n),
            UntaggedResponse::Expunge(seq) => Self::Expunge(seq),
            UntaggedResponse::Fetch { seq, items } => {
                let flags = items
                    .into_iter()
                    .find_map(|item| match item {
                        FetchItem::Flags(f) => Some(f),
                        _ => None,
                    })
                    .unwrap_or_default();
                Self::Fetch { seq, flags }
            }
            other => Self::Other(Box::new(other)),
        }
    }
}

/// Handle for an active IDLE session.
///
/// Borrows the client for as long as IDLE runs. Call [`wait`](Self::wait)
/// to receive events and [`done`](Self::done) to leave IDLE. A handle
/// dropped without `done` leaves the client idling; [`Client::done`]
/// recovers from that.
pub struct IdleHandle<'a, S: Transport> {
    client: &'a mut Client<S>,
    terminated: bool,
}

impl<S: Transport> std::fmt::Debug for IdleHandle<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleHandle")
            .field("tag", &self.client.operation.idle_tag())
            .field("terminated", &self.terminated)
            .finish()
    }
}

impl<S: Transport> IdleHandle<'_, S> {
    /// Waits for a server event or timeout.
    ///
    /// Untagged responses update the connection state and reach the
    /// connection's handler before they are returned. A tagged completion
    /// ends IDLE and yields [`IdleEvent::Terminated`]; an untagged BYE
    /// closes the connection and yields [`Error::Bye`].
    ///
    /// RFC 2177 recommends re-issuing IDLE every 29 minutes. Most servers
    /// have shorter timeouts (10-30 minutes), so consider using shorter
    /// timeouts in practice.
    pub async fn wait(&mut self, duration: Duration) -> Result<IdleEvent> {
        self.wait_with(duration, |_| {}).await
    }

    /// Like [`wait`](Self::wait), also passing the untagged response to
    /// `on_untagged` before it is returned.
    pub async fn wait_with<F>(&mut self, duration: Duration, mut on_untagged: F) -> Result<IdleEvent>
    where
        F: FnMut(&UntaggedResponse) + Send,
    {
        let Some(tag) = self.client.operation.idle_tag().cloned() else {
            return Err(Error::Precondition("IDLE is not running".to_string()));
        };
        let outcome = self.next_event(&tag, duration, &mut on_untagged).await;
        if matches!(outcome, Ok(IdleEvent::Terminated) | Err(_)) {
            self.terminated = true;
            return self.client.settle(outcome);
        }
        outcome
    }

    async fn next_event(
        &mut self,
        tag: &Tag,
        duration: Duration,
        on_untagged: &mut (dyn FnMut(&UntaggedResponse) + Send),
    ) -> Result<IdleEvent> {
        let client = &mut *self.client;
        let Some(raw) = client.read_raw(duration).await? else {
            return Ok(IdleEvent::Timeout);
        };
        match ResponseParser::parse(&raw)? {
            Response::Untagged(untagged) => {
                client.deliver(&untagged, on_untagged);
                if let Some(text) = client.state.bye() {
                    return Err(Error::Bye(text.to_string()));
                }
                Ok(IdleEvent::from_untagged(untagged))
            }
            Response::Tagged(completion) => {
                client.complete(tag, completion)?;
                debug!(%tag, "server ended IDLE");
                Ok(IdleEvent::Terminated)
            }
            Response::Continuation { .. } => Err(Error::Protocol(
                "unexpected continuation during IDLE".to_string(),
            )),
        }
    }

    /// Sends DONE and reads the completion of the IDLE command.
    ///
    /// Does nothing if the server already ended IDLE.
    pub async fn done(self) -> Result<()> {
        if self.terminated {
            return Ok(());
        }
        self.client.done().await
    }
}

impl<S: Transport> Client<S> {
    /// Enters IDLE mode for real-time notifications.
    ///
    /// Returns once the server has answered with its continuation request.
    /// A tagged NO or BAD is returned as an error and leaves the client
    /// usable.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut handle = client.idle().await?;
    /// loop {
    ///     match handle.wait(Duration::from_secs(600)).await? {
    ///         IdleEvent::Exists(n) => println!("New message count: {}", n),
    ///         IdleEvent::Timeout => break,
    ///         _ => {}
    ///     }
    /// }
    /// handle.done().await?;
    /// ```
    pub async fn idle(&mut self) -> Result<IdleHandle<'_, S>> {
        let request = self.prepare(&Command::Idle)?;
        self.operation.begin(request.tag())?;
        let outcome = self.begin_idle(&request).await;
        if let Err(e) = outcome {
            return self.settle(Err(e));
        }
        self.operation.enter_idle();
        Ok(IdleHandle {
            client: self,
            terminated: false,
        })
    }

    async fn begin_idle(&mut self, request: &Request) -> Result<()> {
        debug!(tag = %request.tag(), "C: {}", request.log_line());
        for part in request.parts() {
            self.send_part(part).await?;
        }
        match self.await_step(&mut |_| {}).await? {
            Step::Continue(_) => Ok(()),
            Step::Done(completion) => {
                self.complete(request.tag(), completion)?;
                Err(Error::Protocol(
                    "IDLE completed without a continuation request".to_string(),
                ))
            }
        }
    }

    /// Ends a running IDLE: sends DONE and reads the tagged completion.
    ///
    /// Needed only when the [`IdleHandle`] was dropped; fails with
    /// [`Error::Precondition`] if IDLE is not running.
    pub async fn done(&mut self) -> Result<()> {
        let Some(tag) = self.operation.idle_tag().cloned() else {
            return Err(Error::Precondition("IDLE is not running".to_string()));
        };
        let outcome = self.finish_idle(&tag).await;
        let outcome = self.settle(outcome);
        debug!(%tag, "left IDLE");
        outcome.map(|_| ())
    }

    async fn finish_idle(&mut self, tag: &Tag) -> Result<Completion> {
        debug!(%tag, "C: DONE");
        self.send_part(b"DONE\r\n").await?;
        match self.await_step(&mut |_| {}).await? {
            Step::Done(completion) => self.complete(tag, completion),
            Step::Continue(_) => Err(Error::Protocol(
                "unexpected continuation after DONE".to_string(),
            )),
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
    use std::sync::{Arc, Mutex};

    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::connection::state::Phase;
    use crate::handler::{CollectingHandler, UnsolicitedEvent};

    fn selected_mock() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 SELECT INBOX\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"00001 OK [READ-WRITE] SELECT completed\r\n");
        builder
    }

    async fn selected_client(mock: Mock) -> Client<Mock> {
        let mut client = Client::from_stream(mock).await.unwrap();
        client.select("INBOX").await.unwrap();
        client
    }

    #[tokio::test]
    async fn exists_during_idle_reaches_state_and_handler() {
        let mock = selected_mock()
            .write(b"00002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .read(b"* 5 EXISTS\r\n")
            .write(b"DONE\r\n")
            .read(b"00002 OK IDLE terminated\r\n")
            .build();
        let mut client = selected_client(mock).await;
        let shared = Arc::new(Mutex::new(CollectingHandler::new()));
        client.set_handler(Arc::clone(&shared));

        let mut handle = client.idle().await.unwrap();
        let mut seen = Vec::new();
        let event = handle
            .wait_with(Duration::from_secs(30), |u| seen.push(u.clone()))
            .await
            .unwrap();
        assert_eq!(event, IdleEvent::Exists(5));
        assert_eq!(seen, vec![UntaggedResponse::Exists(5)]);
        handle.done().await.unwrap();

        assert_eq!(client.selected().unwrap().exists, 5);
        assert!(!client.is_idle());
        assert_eq!(
            shared.lock().unwrap().take(),
            vec![UnsolicitedEvent::Exists(5)]
        );
    }

    #[tokio::test]
    async fn commands_are_refused_while_idling() {
        let mock = selected_mock()
            .write(b"00002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .write(b"DONE\r\n")
            .read(b"00002 OK IDLE terminated\r\n")
            .write(b"00003 NOOP\r\n")
            .read(b"00003 OK\r\n")
            .build();
        let mut client = selected_client(mock).await;

        drop(client.idle().await.unwrap());
        assert!(client.is_idle());
        assert!(matches!(
            client.noop().await.unwrap_err(),
            Error::Precondition(_)
        ));
        assert!(matches!(
            client.select("Archive").await.unwrap_err(),
            Error::Precondition(_)
        ));
        assert!(matches!(client.idle().await.unwrap_err(), Error::Precondition(_)));
        assert_eq!(client.selected().unwrap().name.as_str(), "INBOX");

        client.done().await.unwrap();
        client.noop().await.unwrap();
    }

    #[tokio::test]
    async fn done_without_idle_is_refused() {
        let mock = selected_mock().build();
        let mut client = selected_client(mock).await;
        assert!(matches!(
            client.done().await.unwrap_err(),
            Error::Precondition(_)
        ));
    }

    #[tokio::test]
    async fn idle_needs_a_selected_folder() {
        let mock = Builder::new().read(b"* PREAUTH ready\r\n").build();
        let mut client = Client::from_stream(mock).await.unwrap();
        assert!(matches!(client.idle().await.unwrap_err(), Error::Precondition(_)));
    }

    #[tokio::test]
    async fn rejected_idle_keeps_connection_usable() {
        let mock = selected_mock()
            .write(b"00002 IDLE\r\n")
            .read(b"00002 BAD IDLE not supported\r\n")
            .build();
        let mut client = selected_client(mock).await;
        assert!(matches!(client.idle().await.unwrap_err(), Error::Bad { .. }));
        assert!(!client.is_idle());
        assert_eq!(client.phase(), Phase::Selected);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_server_yields_timeout() {
        let mock = selected_mock()
            .write(b"00002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .wait(Duration::from_secs(3600))
            .build();
        let mut client = selected_client(mock).await;
        let mut handle = client.idle().await.unwrap();
        let event = handle.wait(Duration::from_secs(30)).await.unwrap();
        assert_eq!(event, IdleEvent::Timeout);
        drop(handle);
        assert!(client.is_idle());
    }

    #[tokio::test]
    async fn server_can_end_idle() {
        let mock = selected_mock()
            .write(b"00002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .read(b"* 1 EXPUNGE\r\n")
            .read(b"00002 OK IDLE done\r\n")
            .build();
        let mut client = selected_client(mock).await;
        let mut handle = client.idle().await.unwrap();

        let event = handle.wait(Duration::from_secs(30)).await.unwrap();
        assert_eq!(event, IdleEvent::Expunge(SeqNum::new(1).unwrap()));
        let event = handle.wait(Duration::from_secs(30)).await.unwrap();
        assert_eq!(event, IdleEvent::Terminated);
        handle.done().await.unwrap();
        assert!(!client.is_idle());
    }

    #[tokio::test]
    async fn bye_during_idle_closes_connection() {
        let mock = selected_mock()
            .write(b"00002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .read(b"* BYE Autologout; idle for too long\r\n")
            .build();
        let mut client = selected_client(mock).await;
        let mut handle = client.idle().await.unwrap();

        let err = handle.wait(Duration::from_secs(30)).await.unwrap_err();
        assert!(matches!(err, Error::Bye(_)));
        drop(handle);
        assert!(!client.is_idle());
        assert_eq!(client.phase(), Phase::Closed);
    }

    #[tokio::test]
    async fn transport_error_during_idle_poisons_connection() {
        let mock = selected_mock()
            .write(b"00002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))
            .build();
        let mut client = selected_client(mock).await;
        let mut handle = client.idle().await.unwrap();

        let err = handle.wait(Duration::from_secs(30)).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TransportFailure);
        handle.done().await.unwrap();

        assert!(!client.is_idle());
        assert!(matches!(
            client.noop().await.unwrap_err(),
            Error::Precondition(_)
        ));
    }

    #[tokio::test]
    async fn flag_change_becomes_fetch_event() {
        let mock = selected_mock()
            .write(b"00002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .read(b"* 2 FETCH (FLAGS (\\Seen))\r\n")
            .write(b"DONE\r\n")
            .read(b"00002 OK\r\n")
            .build();
        let mut client = selected_client(mock).await;
        let mut handle = client.idle().await.unwrap();

        let IdleEvent::Fetch { seq, flags } = handle.wait(Duration::from_secs(30)).await.unwrap()
        else {
            panic!("expected a fetch event");
        };
        assert_eq!(seq.get(), 2);
        assert!(flags.is_seen());
        handle.done().await.unwrap();
    }
}
