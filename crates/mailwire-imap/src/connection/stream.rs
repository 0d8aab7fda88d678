//! Transports for IMAP connections.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::{Error, Result};

/// A byte stream the client can run IMAP over.
///
/// Besides reading and writing, a transport reports whether it is encrypted
/// and can be upgraded in place for STARTTLS.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// Returns true if traffic is encrypted.
    fn is_secure(&self) -> bool;

    /// Performs a TLS handshake over the existing connection.
    fn upgrade_to_tls(&mut self, host: &str) -> impl Future<Output = Result<()>> + Send;
}

/// A TCP stream that is plaintext or TLS.
pub enum ImapStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
    /// Left behind by a failed STARTTLS handshake.
    Closed,
}

impl std::fmt::Debug for ImapStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Plain(_) => "ImapStream::Plain",
            Self::Tls(_) => "ImapStream::Tls",
            Self::Closed => "ImapStream::Closed",
        })
    }
}

impl Transport for ImapStream {
    fn is_secure(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    async fn upgrade_to_tls(&mut self, host: &str) -> Result<()> {
        match std::mem::replace(self, Self::Closed) {
            Self::Plain(tcp) => {
                let connector = create_tls_connector();
                let server_name = ServerName::try_from(host.to_string())?;
                let tls = connector.connect(server_name, tcp).await?;
                debug!(host, "TLS established over STARTTLS");
                *self = Self::Tls(Box::new(tls));
                Ok(())
            }
            other => {
                *self = other;
                Err(Error::Precondition(
                    "stream is already encrypted or closed".to_string(),
                ))
            }
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "stream closed")
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Closed => Poll::Ready(Err(closed())),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Closed => Poll::Ready(Err(closed())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
            Self::Closed => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Closed => Poll::Ready(Ok(())),
        }
    }
}

/// Creates a TLS connector trusting the webpki root certificates.
#[must_use]
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

async fn connect_tcp(host: &str, port: u16, limit: Duration) -> Result<TcpStream> {
    let addr = format!("{host}:{port}");
    timeout(limit, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::Timeout(limit))?
        .map_err(Error::from)
}

/// Connects to a server with TLS from the start.
pub async fn connect_tls(host: &str, port: u16, limit: Duration) -> Result<ImapStream> {
    let tcp = connect_tcp(host, port, limit).await?;
    let connector = create_tls_connector();
    let server_name = ServerName::try_from(host.to_string())?;
    let tls = timeout(limit, connector.connect(server_name, tcp))
        .await
        .map_err(|_| Error::Timeout(limit))??;
    Ok(ImapStream::Tls(Box::new(tls)))
}

/// Connects to a server without TLS (for STARTTLS or testing).
pub async fn connect_plain(host: &str, port: u16, limit: Duration) -> Result<ImapStream> {
    Ok(ImapStream::Plain(connect_tcp(host, port, limit).await?))
}

#[cfg(test)]
impl Transport for tokio_test::io::Mock {
    fn is_secure(&self) -> bool {
        false
    }

    async fn upgrade_to_tls(&mut self, _host: &str) -> Result<()> {
        Ok(())
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
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn closed_stream_refuses_io_and_upgrade() {
        let mut stream = ImapStream::Closed;
        assert!(!stream.is_secure());
        assert!(stream.write_all(b"x").await.is_err());
        let err = stream.upgrade_to_tls("example.com").await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(matches!(stream, ImapStream::Closed));
    }

    #[tokio::test]
    async fn connect_failure_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let err = connect_plain("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
