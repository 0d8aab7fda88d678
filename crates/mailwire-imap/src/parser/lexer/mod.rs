//! IMAP lexer for tokenizing server responses.
//!
//! Works over one complete response as assembled by the framing layer, so
//! literals appear inline as `{n}\r\n<n bytes>` and are returned as a single
//! [`Token::Literal`].

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::{Error, Result};

/// IMAP lexer state.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        self.input.get(self.pos..).unwrap_or_default()
    }

    /// Returns the bytes consumed since `start`.
    #[must_use]
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        self.input.get(start..self.pos).unwrap_or_default()
    }

    /// Returns true if at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Peeks at the byte at offset from current position.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Advances by one byte and returns it.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Skips n bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Consumes `byte` if it is next. Returns whether it did.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        match byte {
            b'\r' => {
                if self.peek_at(1) == Some(b'\n') {
                    self.skip(2);
                    Ok(Token::Crlf)
                } else {
                    Err(self.error("expected LF after CR"))
                }
            }
            b' ' => self.single(Token::Space),
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b'[' => self.single(Token::LBracket),
            b']' => self.single(Token::RBracket),
            b'*' => self.single(Token::Asterisk),
            b'+' => self.single(Token::Plus),
            b'"' => self.read_quoted_string(),
            b'{' => self.read_literal(),
            b'0'..=b'9' => self.read_number_or_atom(),
            _ if is_atom_char(byte) => self.read_atom(),
            _ => Err(self.error(&format!("unexpected character: {byte:#04x}"))),
        }
    }

    fn single(&mut self, token: Token<'a>) -> Result<Token<'a>> {
        self.pos += 1;
        Ok(token)
    }

    /// Reads a quoted string token. Invalid UTF-8 is replaced, not rejected.
    fn read_quoted_string(&mut self) -> Result<Token<'a>> {
        self.advance();
        let mut result = Vec::new();

        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => result.push(c),
                    Some(c) => return Err(self.error(&format!("invalid escape: \\{}", c as char))),
                    None => return Err(self.error("unexpected end of quoted string")),
                },
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("unterminated quoted string"));
                }
                Some(c) => result.push(c),
            }
        }

        Ok(Token::QuotedString(
            String::from_utf8_lossy(&result).into_owned(),
        ))
    }

    /// Reads `{n}\r\n` followed by exactly `n` bytes. Accepts `{n+}` too.
    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.advance();
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let digits = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid literal size"))?;
        let size: usize = digits
            .parse()
            .map_err(|_| self.error("invalid literal size"))?;

        self.eat(b'+');
        if !self.eat(b'}') {
            return Err(self.error("expected } after literal size"));
        }
        if !(self.eat(b'\r') && self.eat(b'\n')) {
            return Err(self.error("expected CRLF after literal size"));
        }

        let Some(data) = self
            .pos
            .checked_add(size)
            .and_then(|end| self.input.get(self.pos..end))
        else {
            return Err(self.error("incomplete literal data"));
        };
        self.pos += size;
        Ok(Token::Literal(data.to_vec()))
    }

    /// Reads a number, or an atom that happens to start with a digit.
    fn read_number_or_atom(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.advance();
        }
        let s = self.slice_str(start)?;

        if s.bytes().all(|b| b.is_ascii_digit()) {
            let n = s.parse().map_err(|_| self.error("number too large"))?;
            Ok(Token::Number(n))
        } else {
            Ok(Token::Atom(s))
        }
    }

    fn read_atom(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.advance();
        }
        let s = self.slice_str(start)?;

        if s.eq_ignore_ascii_case("NIL") {
            Ok(Token::Nil)
        } else {
            Ok(Token::Atom(s))
        }
    }

    fn slice_str(&self, start: usize) -> Result<&'a str> {
        std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| self.error("invalid UTF-8 in atom"))
    }

    /// Creates a parse error at the current position.
    pub(crate) fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Expects and consumes a token of the same kind.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {expected:?}, got {token:?}")))
        }
    }

    /// Expects and consumes a space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an astring (atom, quoted string, or literal).
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::QuotedString(s) => Ok(s),
            Token::Literal(data) => Ok(String::from_utf8_lossy(&data).into_owned()),
            token => Err(self.error(&format!("expected astring, got {token:?}"))),
        }
    }

    /// Reads an nstring (NIL or string).
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s)),
            Token::Literal(data) => Ok(Some(String::from_utf8_lossy(&data).into_owned())),
            token => Err(self.error(&format!("expected nstring, got {token:?}"))),
        }
    }

    /// Reads a 32-bit number.
    pub fn read_number(&mut self) -> Result<u32> {
        let n = self.read_number64()?;
        u32::try_from(n).map_err(|_| self.error("number exceeds 32 bits"))
    }

    /// Reads a 64-bit number.
    pub fn read_number64(&mut self) -> Result<u64> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("expected atom, got {token:?}"))),
        }
    }

    /// Skips optional spaces.
    pub fn skip_spaces(&mut self) {
        while self.eat(b' ') {}
    }

    /// Consumes the rest of the line and returns it without the CRLF.
    pub fn rest_of_line(&mut self) -> String {
        let remaining = self.remaining();
        let end = remaining
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(remaining.len());
        self.skip(end + 2);
        String::from_utf8_lossy(&remaining[..end]).into_owned()
    }
}

/// Returns true if the byte may appear in an atom.
///
/// `\` is accepted so that flags like `\Seen` lex as one atom.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21 | 0x23..=0x24 | 0x26..=0x27 |
        0x2B..=0x5A |
        0x5C |
        0x5E..=0x7A |
        0x7C |
        0x7E
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tagged_line_tokens() {
        let mut lexer = Lexer::new(b"00001 OK done\r\n");
        assert_eq!(lexer.next_token().unwrap(), Token::Number(1));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("OK"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("done"));
        assert_eq!(lexer.next_token().unwrap(), Token::Crlf);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn quoted_string_escapes() {
        let mut lexer = Lexer::new(b"\"a \\\"b\\\" \\\\c\"");
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::QuotedString("a \"b\" \\c".to_string())
        );
    }

    #[test]
    fn quoted_string_must_close_on_line() {
        let mut lexer = Lexer::new(b"\"open\r\n");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn literal_is_inlined() {
        let mut lexer = Lexer::new(b"{5}\r\nhe)lo rest");
        assert_eq!(lexer.next_token().unwrap(), Token::Literal(b"he)lo".to_vec()));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
    }

    #[test]
    fn non_synchronizing_literal() {
        let mut lexer = Lexer::new(b"{3+}\r\nabc");
        assert_eq!(lexer.next_token().unwrap(), Token::Literal(b"abc".to_vec()));
    }

    #[test]
    fn short_literal_is_an_error() {
        let mut lexer = Lexer::new(b"{10}\r\nabc");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn literal_size_near_usize_max_is_an_error() {
        let input = format!("x {{{}}}\r\nabc", usize::MAX);
        let mut lexer = Lexer::new(input.as_bytes());
        lexer.skip(2);
        assert!(matches!(lexer.next_token(), Err(Error::Parse { .. })));
    }

    #[test]
    fn wide_numbers() {
        let mut lexer = Lexer::new(b"5000000000");
        assert_eq!(lexer.read_number64().unwrap(), 5_000_000_000);
        let mut lexer = Lexer::new(b"5000000000");
        assert!(lexer.read_number().is_err());
    }

    #[test]
    fn nil_any_case() {
        let mut lexer = Lexer::new(b"nil");
        assert_eq!(lexer.next_token().unwrap(), Token::Nil);
    }

    #[test]
    fn rest_of_line_consumes_crlf() {
        let mut lexer = Lexer::new(b"some text here\r\n");
        assert_eq!(lexer.rest_of_line(), "some text here");
        assert!(lexer.is_eof());
    }

    #[test]
    fn atom_chars() {
        assert!(is_atom_char(b'\\'));
        assert!(is_atom_char(b'$'));
        assert!(!is_atom_char(b'%'));
        assert!(!is_atom_char(b'"'));
        assert!(!is_atom_char(b']'));
        assert!(!is_atom_char(b'{'));
        assert!(!is_atom_char(b' '));
    }
}
