//! # mailwire-imap
//!
//! An asynchronous IMAP4rev1 client engine (RFC 3501) with the common
//! extensions: STARTTLS, SASL AUTHENTICATE and SASL-IR, NAMESPACE, QUOTA,
//! ACL, ENABLE, IDLE, UIDPLUS and MOVE.
//!
//! ## Features
//!
//! - **One command in flight**: every command runs through a single
//!   pipeline that sends literals only after the server's continuation
//!   request and matches the tagged completion to the command's tag
//! - **Runtime state gating**: commands issued in the wrong phase, or while
//!   IDLE runs, fail with [`Error::Precondition`] and send nothing
//! - **Typed responses**: untagged data is decoded into
//!   [`UntaggedResponse`], with an `Unknown` variant for anything else
//! - **IDLE support**: real-time push notifications via RFC 2177
//! - **TLS via rustls**: implicit TLS and STARTTLS without OpenSSL
//! - **Sans-I/O parser**: protocol parsing separated from network I/O
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwire_imap::{Client, Config, Security, FetchItems, SequenceSet};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> mailwire_imap::Result<()> {
//!     let config = Config::builder("imap.example.com")
//!         .security(Security::Implicit)
//!         .build();
//!     let mut client = Client::connect(&config).await?;
//!
//!     client.login("user@example.com", "password").await?;
//!
//!     for folder in client.list("", "*").await? {
//!         println!("Folder: {}", folder.mailbox.as_str());
//!     }
//!
//!     let inbox = client.select("INBOX").await?;
//!     println!("Messages: {}", inbox.exists);
//!
//!     let messages = client
//!         .fetch(&SequenceSet::range(1, 10).unwrap(), FetchItems::Fast)
//!         .await?;
//!     println!("Fetched {}", messages.len());
//!
//!     if client.supports_idle() {
//!         let mut handle = client.idle().await?;
//!         match handle.wait(Duration::from_secs(30)).await? {
//!             mailwire_imap::IdleEvent::Exists(n) => println!("New count: {n}"),
//!             mailwire_imap::IdleEvent::Timeout => println!("No updates"),
//!             _ => {}
//!         }
//!         handle.done().await?;
//!     }
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login()/authenticate() ───→ Authenticated
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── select()/examine() ───→ Selected
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │      Selected       │ ─── close()/unselect() ───→ Authenticated
//! └─────────────────────┘      idle() ───→ idling until DONE
//! ```
//!
//! ## Modules
//!
//! - [`command`]: command encoding and argument types
//! - [`connection`]: transports, framing, the client and IDLE
//! - [`handler`]: connection-wide handler for unsolicited responses
//! - [`parser`]: sans-I/O response parser
//! - [`types`]: core IMAP types (flags, mailboxes, sequences, etc.)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod handler;
pub mod parser;
pub mod types;

pub use command::{
    Command, FetchAttribute, FetchItems, Request, SearchCriteria, StatusAttribute, StoreAction,
    TagGenerator,
};
pub use connection::{
    Client, Config, ConfigBuilder, ConnectionState, FetchedMessage, FramedStream, Identity,
    IdleEvent, IdleHandle, ImapStream, Phase, Security, Transport,
};
pub use error::{Error, ErrorKind, Result};
pub use handler::{CollectingHandler, NoopHandler, ResponseHandler, UnsolicitedEvent};
pub use mailwire_sasl as sasl;
pub use parser::{Completion, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, ResponseCode,
    SelectedFolder, SeqNum, SequenceSet, Status, Tag, Uid, UidSet, UidValidity,
};

/// IMAP protocol version implemented.
pub const IMAP_VERSION: &str = "IMAP4rev1";
