//! Wire encoding of command lines.
//!
//! A command is split into parts at every synchronizing literal: each part
//! except the last ends with `{n}\r\n`, and the next part starts with the
//! `n` literal bytes. The pipeline sends part 0, then one further part per
//! `+` continuation from the server.

use crate::parser::lexer::is_atom_char;
use crate::types::Tag;

/// A fully encoded command, ready for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    tag: Tag,
    verb: String,
    parts: Vec<Vec<u8>>,
    log_line: String,
}

impl Request {
    /// Tag of the command.
    #[must_use]
    pub const fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Command verb, e.g. `UID FETCH`.
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Wire parts; each after the first waits for a `+` continuation.
    #[must_use]
    pub fn parts(&self) -> &[Vec<u8>] {
        &self.parts
    }

    /// Printable form with credentials masked and literal bytes elided.
    #[must_use]
    pub fn log_line(&self) -> &str {
        &self.log_line
    }

    /// All parts joined, as they appear on the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.parts.concat()
    }
}

/// Incremental encoder for one command line.
///
/// Argument methods insert the separating space themselves.
#[derive(Debug)]
pub struct CommandBuilder {
    tag: Tag,
    verb: String,
    parts: Vec<Vec<u8>>,
    current: Vec<u8>,
    log_line: String,
}

/// Placeholder written to the log in place of credentials.
pub const REDACTED: &str = "****";

impl CommandBuilder {
    /// Starts a command line `<tag> <verb>`.
    #[must_use]
    pub fn new(tag: &Tag, verb: &str) -> Self {
        let mut current = Vec::with_capacity(64);
        current.extend_from_slice(tag.as_str().as_bytes());
        current.push(b' ');
        current.extend_from_slice(verb.as_bytes());
        Self {
            tag: tag.clone(),
            verb: verb.to_string(),
            parts: Vec::new(),
            current,
            log_line: format!("{tag} {verb}"),
        }
    }

    /// Appends pre-encoded protocol text, such as an atom or a
    /// parenthesized list of atoms.
    pub fn atom(&mut self, text: &str) -> &mut Self {
        self.current.push(b' ');
        self.current.extend_from_slice(text.as_bytes());
        self.log_line.push(' ');
        self.log_line.push_str(text);
        self
    }

    /// Appends an astring: atom when possible, quoted string when it holds
    /// specials, literal when it holds CR, LF, NUL or 8-bit data.
    pub fn astring(&mut self, value: &str) -> &mut Self {
        self.string_arg(value.as_bytes(), false, true)
    }

    /// Appends a string that is always quoted or literal, never an atom.
    pub fn string(&mut self, value: &str) -> &mut Self {
        self.string_arg(value.as_bytes(), false, false)
    }

    /// Appends an astring whose value never reaches the log line.
    pub fn secret(&mut self, value: &str) -> &mut Self {
        self.string_arg(value.as_bytes(), true, true)
    }

    /// Appends a synchronizing literal carrying `data`.
    pub fn literal(&mut self, data: &[u8]) -> &mut Self {
        self.push_literal(data, false)
    }

    /// Ends the current part with a `{len}` literal header whose bytes the
    /// caller streams itself. Used for APPEND from a reader.
    pub fn literal_header(&mut self, len: u64) -> &mut Self {
        self.log_line.push_str(&format!(" {{{len}}} <{len} bytes>"));
        self.current.extend_from_slice(format!(" {{{len}}}\r\n").as_bytes());
        self.parts.push(std::mem::take(&mut self.current));
        self
    }

    /// Terminates the line and returns the request.
    #[must_use]
    pub fn finish(mut self) -> Request {
        self.current.extend_from_slice(b"\r\n");
        self.parts.push(self.current);
        Request {
            tag: self.tag,
            verb: self.verb,
            parts: self.parts,
            log_line: self.log_line,
        }
    }

    /// Finishes a request whose last part is a streamed literal header.
    ///
    /// The caller writes the literal bytes and the closing CRLF.
    #[must_use]
    pub fn finish_streamed(self) -> Request {
        Request {
            tag: self.tag,
            verb: self.verb,
            parts: self.parts,
            log_line: self.log_line,
        }
    }

    fn string_arg(&mut self, value: &[u8], secret: bool, allow_atom: bool) -> &mut Self {
        match encoding_for(value, allow_atom) {
            Encoding::Literal => self.push_literal(value, secret),
            Encoding::Atom => {
                self.current.push(b' ');
                self.current.extend_from_slice(value);
                self.log_value(&String::from_utf8_lossy(value), secret);
                self
            }
            Encoding::Quoted => {
                let quoted = quote(value);
                self.current.push(b' ');
                self.current.extend_from_slice(&quoted);
                self.log_value(&String::from_utf8_lossy(&quoted), secret);
                self
            }
        }
    }

    fn push_literal(&mut self, data: &[u8], secret: bool) -> &mut Self {
        let len = data.len();
        self.current.extend_from_slice(format!(" {{{len}}}\r\n").as_bytes());
        self.parts.push(std::mem::take(&mut self.current));
        self.current.extend_from_slice(data);
        if secret {
            self.log_value("", true);
        } else {
            self.log_line.push_str(&format!(" {{{len}}} <{len} bytes>"));
        }
        self
    }

    fn log_value(&mut self, shown: &str, secret: bool) {
        self.log_line.push(' ');
        self.log_line.push_str(if secret { REDACTED } else { shown });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Atom,
    Quoted,
    Literal,
}

fn encoding_for(value: &[u8], allow_atom: bool) -> Encoding {
    if value
        .iter()
        .any(|&b| b == b'\r' || b == b'\n' || b == 0 || !b.is_ascii())
    {
        Encoding::Literal
    } else if allow_atom
        && !value.is_empty()
        && value.iter().all(|&b| is_atom_char(b) && b != b'\\')
    {
        Encoding::Atom
    } else {
        Encoding::Quoted
    }
}

fn quote(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 2);
    out.push(b'"');
    for &b in value {
        if b == b'"' || b == b'\\' {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b'"');
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tag() -> Tag {
        Tag::new("00007")
    }

    #[test]
    fn atoms_and_quoting() {
        let mut b = CommandBuilder::new(&tag(), "LIST");
        b.astring("").astring("*");
        assert_eq!(b.finish().to_bytes(), b"00007 LIST \"\" \"*\"\r\n");

        let mut b = CommandBuilder::new(&tag(), "SELECT");
        b.astring("My \"Box\"");
        assert_eq!(b.finish().to_bytes(), b"00007 SELECT \"My \\\"Box\\\"\"\r\n");
    }

    #[test]
    fn eight_bit_value_becomes_literal() {
        let mut b = CommandBuilder::new(&tag(), "SEARCH");
        b.atom("CHARSET UTF-8 SUBJECT").astring("caf\u{e9}");
        let req = b.finish();
        assert_eq!(req.parts().len(), 2);
        assert_eq!(req.parts()[0], b"00007 SEARCH CHARSET UTF-8 SUBJECT {5}\r\n");
        assert_eq!(req.parts()[1], "caf\u{e9}\r\n".as_bytes());
        assert_eq!(req.log_line(), "00007 SEARCH CHARSET UTF-8 SUBJECT {5} <5 bytes>");
    }

    #[test]
    fn secret_is_masked() {
        let mut b = CommandBuilder::new(&tag(), "LOGIN");
        b.astring("bob").secret("s3cr3t pass");
        let req = b.finish();
        assert_eq!(req.to_bytes(), b"00007 LOGIN bob \"s3cr3t pass\"\r\n");
        assert_eq!(req.log_line(), "00007 LOGIN bob ****");
    }

    #[test]
    fn secret_literal_is_masked() {
        let mut b = CommandBuilder::new(&tag(), "LOGIN");
        b.astring("bob").secret("p\u{e4}ss");
        let req = b.finish();
        assert_eq!(req.parts().len(), 2);
        assert!(!req.log_line().contains("p\u{e4}ss"));
        assert!(req.log_line().ends_with(REDACTED));
    }

    #[test]
    fn literal_header_for_streaming() {
        let mut b = CommandBuilder::new(&tag(), "APPEND");
        b.astring("INBOX").literal_header(1024);
        let req = b.finish_streamed();
        assert_eq!(req.parts(), &[b"00007 APPEND INBOX {1024}\r\n".to_vec()]);
        assert_eq!(req.log_line(), "00007 APPEND INBOX {1024} <1024 bytes>");
    }
}
