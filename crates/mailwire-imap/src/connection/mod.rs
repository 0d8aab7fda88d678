//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext transports and the STARTTLS upgrade
//! - Framed I/O that keeps literals attached to their lines
//! - The client, its command pipeline and the state that gates commands
//! - IDLE support for real-time notifications

mod client;
mod config;
mod framed;
mod idle;
mod operation;
mod state;
mod stream;

pub use client::{Client, FetchedMessage};
pub use config::{Config, ConfigBuilder, DEFAULT_MAX_LINE_LENGTH, DEFAULT_MAX_LITERAL_SIZE, Security};
pub use framed::FramedStream;
pub use idle::{IdleEvent, IdleHandle};
pub use state::{ConnectionState, Identity, Phase};
pub use stream::{ImapStream, Transport, connect_plain, connect_tls, create_tls_connector};
