//! Framed I/O for IMAP protocol.
//!
//! IMAP uses CRLF-terminated lines with support for literals.
//! This module provides buffered reading and writing with proper
//! handling of the IMAP framing.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

use super::config::{DEFAULT_MAX_LINE_LENGTH, DEFAULT_MAX_LITERAL_SIZE};
use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Framed connection for IMAP protocol.
///
/// Handles line-based reading with literal support and unbuffered writing.
/// Reading is cancel-safe: a partly received response survives a dropped
/// `read_response` future and is completed by the next call.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    response: BytesMut,
    line_start: usize,
    literal_remaining: usize,
    max_line_length: usize,
    max_literal_size: usize,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream with the default limits.
    pub fn new(stream: S) -> Self {
        Self::with_limits(stream, DEFAULT_MAX_LINE_LENGTH, DEFAULT_MAX_LITERAL_SIZE)
    }

    /// Creates a new framed stream with explicit limits.
    pub fn with_limits(stream: S, max_line_length: usize, max_literal_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            response: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            line_start: 0,
            literal_remaining: 0,
            max_line_length,
            max_literal_size,
        }
    }

    /// Reads one complete response, literals included.
    ///
    /// A line ending in `{n}` or `{n+}` is followed by exactly `n` literal
    /// bytes and then more of the same response, so reading continues until
    /// a line without a trailing literal.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if self.literal_remaining > 0 {
                let n = buf.len().min(self.literal_remaining);
                self.response.extend_from_slice(&buf[..n]);
                self.reader.consume(n);
                self.literal_remaining -= n;
                if self.literal_remaining == 0 {
                    self.line_start = self.response.len();
                }
                continue;
            }

            // A CR may end one read and its LF start the next.
            let seam = self.response.len() > self.line_start
                && self.response.last() == Some(&b'\r')
                && buf[0] == b'\n';
            let line_end = if seam {
                Some(1)
            } else {
                find_crlf(buf).map(|pos| pos + 2)
            };

            let Some(end) = line_end else {
                let len = buf.len();
                self.response.extend_from_slice(buf);
                self.reader.consume(len);
                if self.response.len() - self.line_start > self.max_line_length {
                    self.discard();
                    return Err(Error::Protocol("line too long".to_string()));
                }
                continue;
            };

            self.response.extend_from_slice(&buf[..end]);
            self.reader.consume(end);

            match parse_literal_length(&self.response[self.line_start..]) {
                Some(len) if len > self.max_literal_size => {
                    self.discard();
                    return Err(Error::Protocol(format!(
                        "literal too large: {len} bytes (max {})",
                        self.max_literal_size
                    )));
                }
                Some(0) => self.line_start = self.response.len(),
                Some(len) => self.literal_remaining = len,
                None => {
                    let response = self.response.split().to_vec();
                    self.line_start = 0;
                    if tracing::enabled!(tracing::Level::TRACE) {
                        trace!("S: {}", printable(&response));
                    }
                    return Ok(response);
                }
            }
        }
    }

    fn discard(&mut self) {
        self.response.clear();
        self.line_start = 0;
        self.literal_remaining = 0;
    }

    /// Writes bytes and flushes them.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Writes bytes without flushing, for streamed literals.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        self.reader.get_mut().write_all(data).await?;
        Ok(())
    }

    /// Flushes the underlying stream.
    pub async fn flush(&mut self) -> Result<()> {
        self.reader.get_mut().flush().await?;
        Ok(())
    }

    /// Returns true if bytes were received that no response has consumed.
    #[must_use]
    pub fn has_buffered_data(&self) -> bool {
        !self.reader.buffer().is_empty()
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Gets a mutable reference to the underlying stream.
    ///
    /// Bytes already buffered stay buffered.
    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses a literal length from the end of a line.
///
/// Matches patterns like `{123}\r\n` or `{123+}\r\n` (non-synchronizing).
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);
    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Renders a response for the trace log with literal bodies elided.
fn printable(response: &[u8]) -> String {
    let mut out = String::new();
    let mut rest = response;
    while let Some(pos) = find_crlf(rest) {
        let line = &rest[..pos + 2];
        out.push_str(String::from_utf8_lossy(&line[..pos]).as_ref());
        rest = &rest[pos + 2..];
        if let Some(len) = parse_literal_length(line) {
            let skip = len.min(rest.len());
            out.push_str(&format!(" <{len} bytes>"));
            rest = &rest[skip..];
        }
    }
    out
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
    use tokio_test::io::Builder;

    use super::*;

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
        assert_eq!(find_crlf(b"just\r"), None);
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"BODY {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"{999999}\r\n"), Some(999_999));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
        assert_eq!(parse_literal_length(b"empty {}\r\n"), None);
    }

    #[test]
    fn printable_elides_literals() {
        let shown = printable(b"* 1 FETCH (BODY[] {5}\r\nhello)\r\n");
        assert_eq!(shown, "* 1 FETCH (BODY[] {5} <5 bytes>)");
    }

    #[tokio::test]
    async fn test_framed_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK ready\r\n");
        assert!(!framed.has_buffered_data());
    }

    #[tokio::test]
    async fn test_framed_read_with_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn literal_containing_crlf_is_not_split() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {7}\r\na\r\nb\r\n) X {2}\r\n")
            .read(b"{}")
            .read(b")\r\n* 2 EXISTS\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(
            response,
            b"* 1 FETCH (BODY[] {7}\r\na\r\nb\r\n) X {2}\r\n{})\r\n".to_vec()
        );
        assert!(framed.has_buffered_data());
        assert_eq!(framed.read_response().await.unwrap(), b"* 2 EXISTS\r\n");
    }

    #[tokio::test]
    async fn crlf_split_across_reads() {
        let mock = Builder::new().read(b"* OK ready\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn read_survives_cancellation() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {5}\r\nhel")
            .wait(std::time::Duration::from_millis(100))
            .read(b"lo)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let first =
            tokio::time::timeout(std::time::Duration::from_millis(20), framed.read_response())
                .await;
        assert!(first.is_err());
        assert_eq!(
            framed.read_response().await.unwrap(),
            b"* 1 FETCH (BODY[] {5}\r\nhello)\r\n"
        );
    }

    #[tokio::test]
    async fn test_framed_write_all() {
        let mock = Builder::new().write(b"00001 LOGIN user pass\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_all(b"00001 LOGIN user pass\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn eof_is_io_error() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);
        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let header = format!("* 1 FETCH (BODY {{{}}}\r\n", 4097);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::with_limits(mock, 1024, 4096);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_literal_at_limit_allowed() {
        let header = b"* 1 FETCH (BODY {1000}\r\n";
        let literal_data = vec![b'X'; 1000];

        let mock = Builder::new()
            .read(header)
            .read(&literal_data)
            .read(b")\r\n")
            .build();
        let mut framed = FramedStream::with_limits(mock, 1024, 1000);

        assert!(framed.read_response().await.is_ok());
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(2048);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::with_limits(mock, 1024, 4096);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("line too long"));
    }
}
