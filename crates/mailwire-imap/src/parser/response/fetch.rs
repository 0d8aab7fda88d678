//! FETCH response decoding.
//!
//! The framing layer has already inlined every literal, so a FETCH whose
//! body spans several raw reads decodes here as one token stream.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::Result;

use super::helpers::parse_flag_list;
use super::types::{Address, BodyStructure, Envelope, FetchItem};

/// Parses the parenthesized data-item list of a FETCH response.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name,
            token => return Err(lexer.error(&format!("unexpected token in FETCH: {token:?}"))),
        };

        match name.to_uppercase().as_str() {
            "FLAGS" => {
                lexer.expect_space()?;
                items.push(FetchItem::Flags(parse_flag_list(lexer)?));
            }
            "UID" => {
                lexer.expect_space()?;
                let n = lexer.read_number()?;
                let uid = Uid::new(n).ok_or_else(|| lexer.error("UID cannot be 0"))?;
                items.push(FetchItem::Uid(uid));
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Rfc822Size(lexer.read_number()?));
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                if let Some(date) = lexer.read_nstring()? {
                    items.push(FetchItem::InternalDate(date));
                }
            }
            "ENVELOPE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Envelope(Box::new(parse_envelope(lexer)?)));
            }
            "BODYSTRUCTURE" => {
                lexer.expect_space()?;
                items.push(FetchItem::BodyStructure(parse_body_structure(lexer)?));
            }
            "BODY" if lexer.peek() == Some(b' ') => {
                // Non-extensible BODY is a structure, not section data.
                lexer.expect_space()?;
                items.push(FetchItem::BodyStructure(parse_body_structure(lexer)?));
            }
            "BODY" | "BINARY" | "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
                let (section, origin) = parse_section_and_origin(lexer);
                lexer.expect_space()?;
                let data = match lexer.next_token()? {
                    Token::Literal(d) => Some(d),
                    Token::QuotedString(s) => Some(s.into_bytes()),
                    Token::Nil => None,
                    token => return Err(lexer.error(&format!("expected body data, got {token:?}"))),
                };
                items.push(FetchItem::Body {
                    section,
                    origin,
                    data,
                });
            }
            "MODSEQ" => {
                lexer.expect_space()?;
                lexer.expect(Token::LParen)?;
                let n = lexer.read_number64()?;
                lexer.expect(Token::RParen)?;
                items.push(FetchItem::ModSeq(n));
            }
            _ => {
                lexer.expect_space()?;
                skip_value(lexer)?;
            }
        }
    }

    Ok(items)
}

/// Parses the optional `[section]` and `<origin>` after BODY.
fn parse_section_and_origin(lexer: &mut Lexer<'_>) -> (Option<String>, Option<u32>) {
    let mut section = None;
    let mut origin = None;

    if lexer.eat(b'[') {
        let mut buf = String::new();
        while let Some(b) = lexer.advance() {
            if b == b']' {
                break;
            }
            buf.push(char::from(b));
        }
        if !buf.is_empty() {
            section = Some(buf);
        }
    }

    if lexer.eat(b'<') {
        let mut buf = String::new();
        while let Some(b) = lexer.peek().filter(u8::is_ascii_digit) {
            buf.push(char::from(b));
            lexer.advance();
        }
        lexer.eat(b'>');
        origin = buf.parse().ok();
    }

    (section, origin)
}

/// Parses an ENVELOPE structure.
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::LParen)?;

    let date = lexer.read_nstring()?;
    lexer.expect_space()?;
    let subject = lexer.read_nstring()?;
    lexer.expect_space()?;

    let mut lists: [Vec<Address>; 6] = Default::default();
    for list in &mut lists {
        *list = parse_address_list(lexer)?;
        lexer.expect_space()?;
    }
    let [from, sender, reply_to, to, cc, bcc] = lists;

    let in_reply_to = lexer.read_nstring()?;
    lexer.expect_space()?;
    let message_id = lexer.read_nstring()?;
    lexer.expect(Token::RParen)?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                lexer.skip_spaces();
                if lexer.eat(b')') {
                    break;
                }
                addresses.push(parse_address(lexer)?);
            }
            Ok(addresses)
        }
        token => Err(lexer.error(&format!("expected address list, got {token:?}"))),
    }
}

fn parse_address(lexer: &mut Lexer<'_>) -> Result<Address> {
    lexer.expect(Token::LParen)?;
    let name = lexer.read_nstring()?;
    lexer.expect_space()?;
    let adl = lexer.read_nstring()?;
    lexer.expect_space()?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect_space()?;
    let host = lexer.read_nstring()?;
    lexer.expect(Token::RParen)?;

    Ok(Address {
        name,
        adl,
        mailbox,
        host,
    })
}

/// Parses BODYSTRUCTURE. Extension data after the basic fields is skipped.
pub fn parse_body_structure(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    lexer.expect(Token::LParen)?;

    if lexer.peek() == Some(b'(') {
        let mut bodies = Vec::new();
        while lexer.peek() == Some(b'(') {
            bodies.push(parse_body_structure(lexer)?);
            lexer.skip_spaces();
        }
        let subtype = lexer.read_nstring()?.unwrap_or_default().to_uppercase();
        skip_to_close(lexer)?;
        return Ok(BodyStructure::Multipart { bodies, subtype });
    }

    let media_type = lexer.read_nstring()?.unwrap_or_default().to_uppercase();
    lexer.expect_space()?;
    let media_subtype = lexer.read_nstring()?.unwrap_or_default().to_uppercase();
    lexer.expect_space()?;
    let params = parse_body_params(lexer)?;
    lexer.expect_space()?;
    let id = lexer.read_nstring()?;
    lexer.expect_space()?;
    let description = lexer.read_nstring()?;
    lexer.expect_space()?;
    let encoding = lexer.read_nstring()?.unwrap_or_default();
    lexer.expect_space()?;
    let size = lexer.read_number()?;

    if media_type == "TEXT" {
        let lines = if lexer.eat(b' ') {
            lexer.read_number()?
        } else {
            0
        };
        skip_to_close(lexer)?;
        return Ok(BodyStructure::Text {
            subtype: media_subtype,
            params,
            id,
            description,
            encoding,
            size,
            lines,
        });
    }

    skip_to_close(lexer)?;
    Ok(BodyStructure::Basic {
        media_type,
        media_subtype,
        params,
        id,
        description,
        encoding,
        size,
    })
}

fn parse_body_params(lexer: &mut Lexer<'_>) -> Result<Vec<(String, String)>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut params = Vec::new();
            loop {
                lexer.skip_spaces();
                if lexer.eat(b')') {
                    break;
                }
                let key = lexer.read_nstring()?.unwrap_or_default();
                lexer.skip_spaces();
                let value = lexer.read_nstring()?.unwrap_or_default();
                params.push((key, value));
            }
            Ok(params)
        }
        token => Err(lexer.error(&format!("expected body parameters, got {token:?}"))),
    }
}

/// Consumes tokens up to and including the `)` closing the current list.
fn skip_to_close(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => return Ok(()),
            Token::RParen => depth -= 1,
            Token::Crlf | Token::Eof => return Err(lexer.error("unterminated list")),
            _ => {}
        }
    }
}

/// Consumes one value of an unrecognized data item.
fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    match lexer.next_token()? {
        Token::LParen => skip_to_close(lexer),
        Token::LBracket => {
            while lexer.peek().is_some_and(|b| b != b']') {
                lexer.advance();
            }
            lexer.eat(b']');
            Ok(())
        }
        Token::Crlf | Token::Eof => Err(lexer.error("missing FETCH item value")),
        _ => Ok(()),
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
    use super::*;

    #[test]
    fn uid_and_flags() {
        let mut lexer = Lexer::new(b"(UID 123 FLAGS (\\Seen))");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], FetchItem::Uid(uid) if uid.get() == 123));
        assert!(matches!(&items[1], FetchItem::Flags(f) if f.is_seen()));
    }

    #[test]
    fn uid_zero_rejected() {
        let mut lexer = Lexer::new(b"(UID 0)");
        let err = parse_fetch_response(&mut lexer).unwrap_err();
        assert!(err.to_string().contains("UID"));
    }

    #[test]
    fn body_literal_with_section_and_origin() {
        let mut lexer = Lexer::new(b"(BODY[TEXT]<100> {5}\r\nHello UID 9)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(
            items[0],
            FetchItem::Body {
                section: Some("TEXT".to_string()),
                origin: Some(100),
                data: Some(b"Hello".to_vec()),
            }
        );
        assert!(matches!(items[1], FetchItem::Uid(uid) if uid.get() == 9));
    }

    #[test]
    fn two_literals_in_one_response() {
        let mut lexer =
            Lexer::new(b"(BODY[HEADER] {4}\r\nab\r\n BODY[1] {3}\r\nxyz)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], FetchItem::Body { data: Some(d), .. } if d == b"ab\r\n"));
        assert!(matches!(&items[1], FetchItem::Body { data: Some(d), .. } if d == b"xyz"));
    }

    #[test]
    fn modseq_is_64_bit() {
        let mut lexer = Lexer::new(b"(MODSEQ (12345678901))");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(items, vec![FetchItem::ModSeq(12345678901)]);
    }

    #[test]
    fn unknown_items_are_skipped() {
        let mut lexer = Lexer::new(b"(X-GM-LABELS (\\Inbox \"a b\") X-GM-MSGID 99 UID 7)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], FetchItem::Uid(uid) if uid.get() == 7));
    }

    #[test]
    fn envelope_with_addresses() {
        let data = b"(\"Mon, 7 Feb 1994 21:52:25 -0800\" \"hello\" ((\"Bob\" NIL \"bob\" \"example.org\")) NIL NIL ((NIL NIL \"amy\" \"example.com\")) NIL NIL NIL \"<1@example.org>\")";
        let mut lexer = Lexer::new(data);
        let envelope = parse_envelope(&mut lexer).unwrap();
        assert_eq!(envelope.subject.as_deref(), Some("hello"));
        assert_eq!(envelope.from[0].email().as_deref(), Some("bob@example.org"));
        assert_eq!(envelope.to[0].email().as_deref(), Some("amy@example.com"));
        assert!(envelope.cc.is_empty());
        assert_eq!(envelope.message_id.as_deref(), Some("<1@example.org>"));
    }

    #[test]
    fn multipart_body_structure() {
        let data = b"((\"TEXT\" \"PLAIN\" (\"CHARSET\" \"US-ASCII\") NIL NIL \"7BIT\" 1152 23) (\"APPLICATION\" \"PDF\" (\"NAME\" \"a.pdf\") NIL NIL \"BASE64\" 4554 NIL (\"attachment\" NIL) NIL) \"MIXED\" (\"BOUNDARY\" \"x\") NIL NIL)";
        let mut lexer = Lexer::new(data);
        let body = parse_body_structure(&mut lexer).unwrap();
        let BodyStructure::Multipart { bodies, subtype } = body else {
            panic!("expected multipart");
        };
        assert_eq!(subtype, "MIXED");
        assert!(matches!(&bodies[0], BodyStructure::Text { lines: 23, .. }));
        assert!(matches!(&bodies[1], BodyStructure::Basic { size: 4554, .. }));
    }
}
