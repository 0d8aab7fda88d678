//! End-to-end client scenarios against a scripted server.
//!
//! The scripted stream releases each server turn only after the client has
//! written exactly the bytes the script expects, so ordering mistakes and
//! stray writes fail the test instead of passing silently.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailwire_imap::sasl::Plain;
use mailwire_imap::{
    Capability, Client, ErrorKind, Flag, Flags, IdleEvent, Phase, Transport, UntaggedResponse,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

enum Turn {
    Server(Vec<u8>),
    Client(Vec<u8>),
}

/// Every `poll_write` the client made, in order.
type WriteLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// Mock stream that plays a fixed conversation.
struct ScriptedStream {
    script: VecDeque<Turn>,
    received: Vec<u8>,
    writes: WriteLog,
    secure: bool,
}

impl ScriptedStream {
    fn new(script: Script) -> (Self, WriteLog) {
        let writes = WriteLog::default();
        let stream = Self {
            script: script.turns,
            received: Vec::new(),
            writes: Arc::clone(&writes),
            secure: false,
        };
        (stream, writes)
    }

    fn match_client_turns(&mut self) {
        while let Some(Turn::Client(expected)) = self.script.front() {
            let n = expected.len().min(self.received.len());
            assert_eq!(
                String::from_utf8_lossy(&self.received[..n]),
                String::from_utf8_lossy(&expected[..n]),
                "client wrote unexpected bytes"
            );
            if self.received.len() < expected.len() {
                return;
            }
            self.received.drain(..expected.len());
            self.script.pop_front();
        }
        assert!(
            self.received.is_empty(),
            "client wrote {:?} when the server was due to speak",
            String::from_utf8_lossy(&self.received)
        );
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.script.front_mut() {
            None => Poll::Ready(Ok(())),
            Some(Turn::Client(expected)) => Poll::Ready(Err(io::Error::other(format!(
                "client read while the server waits for {:?}",
                String::from_utf8_lossy(expected)
            )))),
            Some(Turn::Server(data)) => {
                let n = data.len().min(buf.remaining());
                buf.put_slice(&data[..n]);
                data.drain(..n);
                if data.is_empty() {
                    self.script.pop_front();
                }
                Poll::Ready(Ok(()))
            }
        }
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.writes.lock().unwrap().push(buf.to_vec());
        self.received.extend_from_slice(buf);
        self.match_client_turns();
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl Transport for ScriptedStream {
    fn is_secure(&self) -> bool {
        self.secure
    }

    async fn upgrade_to_tls(&mut self, _host: &str) -> mailwire_imap::Result<()> {
        self.secure = true;
        Ok(())
    }
}

#[derive(Default)]
struct Script {
    turns: VecDeque<Turn>,
}

impl Script {
    fn server(mut self, data: &str) -> Self {
        self.turns.push_back(Turn::Server(data.as_bytes().to_vec()));
        self
    }

    fn client(mut self, data: &str) -> Self {
        self.turns.push_back(Turn::Client(data.as_bytes().to_vec()));
        self
    }

    async fn connect(self) -> (Client<ScriptedStream>, WriteLog) {
        init_tracing();
        let (stream, writes) = ScriptedStream::new(self);
        (Client::from_stream(stream).await.unwrap(), writes)
    }
}

fn write_count(writes: &WriteLog) -> usize {
    writes.lock().unwrap().len()
}

#[tokio::test]
async fn end_to_end_login_and_select() {
    let (mut client, _) = Script::default()
        .server("* OK ready\r\n")
        .client("00001 CAPABILITY\r\n")
        .server("* CAPABILITY IMAP4rev1 AUTH=PLAIN\r\n0001 OK\r\n")
        .client("00002 LOGIN bob secret\r\n")
        .server("0002 OK\r\n")
        .client("00003 SELECT INBOX\r\n")
        .server("* 3 EXISTS\r\n* 0 RECENT\r\n* FLAGS (\\Seen \\Deleted)\r\n0003 OK [READ-WRITE]\r\n")
        .connect()
        .await;

    assert_eq!(client.greeting(), Some("ready"));
    let caps = client.capability().await.unwrap();
    assert_eq!(caps, vec![Capability::Imap4Rev1, Capability::Auth("PLAIN".into())]);

    client.login("bob", "secret").await.unwrap();
    assert_eq!(client.identity().unwrap().username, "bob");

    let folder = client.select("INBOX").await.unwrap();
    assert_eq!(folder.name.as_str(), "INBOX");
    assert_eq!(folder.exists, 3);
    assert_eq!(folder.recent, 0);
    assert!(!folder.read_only);
    assert!(
        folder
            .flags
            .same_set(&Flags::from_vec(vec![Flag::Seen, Flag::Deleted]))
    );
    assert_eq!(client.phase(), Phase::Selected);
}

#[tokio::test]
async fn tags_are_sequential_and_restart_on_a_new_connection() {
    let (mut client, _) = Script::default()
        .server("* PREAUTH ready\r\n")
        .client("00001 NOOP\r\n")
        .server("00001 OK\r\n")
        .client("00002 NOOP\r\n")
        .server("00002 OK\r\n")
        .client("00003 LOGOUT\r\n")
        .server("* BYE logging out\r\n00003 OK\r\n")
        .connect()
        .await;

    client.noop().await.unwrap();
    client.noop().await.unwrap();
    assert_eq!(client.commands_issued(), 2);
    client.logout().await.unwrap();
    assert_eq!(client.phase(), Phase::Closed);

    let (mut again, _) = Script::default()
        .server("* PREAUTH ready\r\n")
        .client("00001 NOOP\r\n")
        .server("00001 OK\r\n")
        .connect()
        .await;
    again.noop().await.unwrap();
    assert_eq!(again.commands_issued(), 1);
}

#[tokio::test]
async fn select_before_login_sends_nothing() {
    let (mut client, writes) = Script::default().server("* OK ready\r\n").connect().await;

    let err = client.select("INBOX").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    assert_eq!(write_count(&writes), 0);
    assert_eq!(client.phase(), Phase::NotAuthenticated);
}

#[tokio::test]
async fn idling_blocks_every_command_but_done() {
    let (mut client, writes) = Script::default()
        .server("* PREAUTH ready\r\n")
        .client("00001 SELECT INBOX\r\n")
        .server("* 1 EXISTS\r\n00001 OK [READ-WRITE] done\r\n")
        .client("00002 IDLE\r\n")
        .server("+ idling\r\n")
        .client("DONE\r\n")
        .server("00002 OK IDLE terminated\r\n")
        .connect()
        .await;

    client.select("INBOX").await.unwrap();
    drop(client.idle().await.unwrap());
    let before = write_count(&writes);

    for err in [
        client.noop().await.unwrap_err(),
        client.capability().await.unwrap_err(),
        client.list("", "*").await.map(|_| ()).unwrap_err(),
        client.expunge().await.map(|_| ()).unwrap_err(),
        client.logout().await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }
    assert_eq!(write_count(&writes), before);

    client.done().await.unwrap();
    assert!(!client.is_idle());
}

#[tokio::test]
async fn authenticate_round_trip_takes_two_writes() {
    let (mut client, writes) = Script::default()
        .server("* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready\r\n")
        .client("00001 AUTHENTICATE PLAIN\r\n")
        .server("+ OK\r\n")
        .client("AGJvYgBzZWNyZXQ=\r\n")
        .server("00001 OK authenticated\r\n")
        .connect()
        .await;

    client
        .authenticate(&mut Plain::new("bob", "secret"))
        .await
        .unwrap();

    let identity = client.identity().unwrap();
    assert_eq!(identity.username, "bob");
    assert_eq!(identity.mechanism, "PLAIN");
    assert_eq!(write_count(&writes), 3);
    assert_eq!(client.phase(), Phase::Authenticated);
}

#[tokio::test]
async fn append_writes_exactly_the_declared_length() {
    let (mut client, writes) = Script::default()
        .server("* PREAUTH ready\r\n")
        .client("00001 APPEND INBOX {5}\r\n")
        .server("+ Ready for literal data\r\n")
        .client("hello\r\n")
        .server("00001 OK APPEND completed\r\n")
        .client("00002 APPEND INBOX {8}\r\n")
        .server("+ Ready for literal data\r\n")
        .client("short   \r\n")
        .server("00002 OK APPEND completed\r\n")
        .connect()
        .await;

    client
        .append_from_reader("INBOX", &[], None, &b"hello world"[..], 5)
        .await
        .unwrap();
    client
        .append_from_reader("INBOX", &[], None, &b"short"[..], 8)
        .await
        .unwrap();

    let log = writes.lock().unwrap();
    let sent: Vec<u8> = log.iter().flatten().copied().collect();
    let text = String::from_utf8(sent).unwrap();
    assert!(text.contains("{5}\r\nhello\r\n00002"));
    assert!(text.ends_with("{8}\r\nshort   \r\n"));
}

#[tokio::test]
async fn failed_select_leaves_nothing_selected() {
    let (mut client, _) = Script::default()
        .server("* PREAUTH ready\r\n")
        .client("00001 SELECT A\r\n")
        .server("* 4 EXISTS\r\n00001 OK [READ-WRITE] SELECT completed\r\n")
        .client("00002 SELECT B\r\n")
        .server("00002 NO [NONEXISTENT] Mailbox doesn't exist: B\r\n")
        .connect()
        .await;

    client.select("A").await.unwrap();
    assert_eq!(client.selected().unwrap().name.as_str(), "A");

    let err = client.select("B").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerRejection);
    assert!(client.selected().is_none());
    assert_eq!(client.phase(), Phase::Authenticated);
}

#[tokio::test]
async fn starttls_replaces_capability_cache() {
    let (mut client, _) = Script::default()
        .server("* OK ready\r\n")
        .client("00001 CAPABILITY\r\n")
        .server("* CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED\r\n00001 OK\r\n")
        .client("00002 STARTTLS\r\n")
        .server("00002 OK Begin TLS negotiation now\r\n")
        .client("00003 CAPABILITY\r\n")
        .server("* CAPABILITY IMAP4rev1 AUTH=PLAIN\r\n00003 OK\r\n")
        .connect()
        .await;

    client.capability().await.unwrap();
    assert!(client.login_disabled());

    client.starttls("imap.example.com").await.unwrap();
    assert!(client.is_secure());
    assert!(client.capabilities().is_empty());

    client.capability().await.unwrap();
    assert_eq!(
        client.capabilities(),
        &[Capability::Imap4Rev1, Capability::Auth("PLAIN".into())]
    );
    assert!(!client.login_disabled());
}

#[tokio::test]
async fn idle_delivers_exists_before_done() {
    let (mut client, _) = Script::default()
        .server("* PREAUTH ready\r\n")
        .client("00001 SELECT INBOX\r\n")
        .server("* 3 EXISTS\r\n00001 OK [READ-WRITE] SELECT completed\r\n")
        .client("00002 IDLE\r\n")
        .server("+ idling\r\n* 5 EXISTS\r\n")
        .client("DONE\r\n")
        .server("00002 OK IDLE terminated\r\n")
        .connect()
        .await;

    client.select("INBOX").await.unwrap();

    let mut delivered = Vec::new();
    let mut handle = client.idle().await.unwrap();
    let event = handle
        .wait_with(Duration::from_secs(5), |u| delivered.push(u.clone()))
        .await
        .unwrap();
    assert_eq!(event, IdleEvent::Exists(5));
    assert_eq!(delivered, vec![UntaggedResponse::Exists(5)]);
    handle.done().await.unwrap();

    assert_eq!(client.selected().unwrap().exists, 5);
    assert!(!client.is_idle());
}
