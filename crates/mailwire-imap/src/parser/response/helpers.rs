//! Decoders for the core RFC 3501 data responses and response codes.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    AppendUid, Capability, CopyUid, Flag, Flags, ListResponse, Mailbox, MailboxAttribute,
    MailboxStatus, ResponseCode, SeqNum, Uid, UidSet, UidValidity,
};
use crate::Result;

/// Parses a bracketed response code, brackets included.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;

    let code = match atom.to_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDNOTSTICKY" => ResponseCode::UidNotSticky,
        // Zero is invalid for these; such codes are kept as unknown.
        "UIDNEXT" => {
            lexer.expect_space()?;
            Uid::new(lexer.read_number()?)
                .map_or_else(|| ResponseCode::Unknown(atom.to_string()), ResponseCode::UidNext)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            UidValidity::new(lexer.read_number()?).map_or_else(
                || ResponseCode::Unknown(atom.to_string()),
                ResponseCode::UidValidity,
            )
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            SeqNum::new(lexer.read_number()?)
                .map_or_else(|| ResponseCode::Unknown(atom.to_string()), ResponseCode::Unseen)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?.into_iter().collect())
        }
        "APPENDUID" => {
            lexer.expect_space()?;
            let uid_validity = read_uid_validity(lexer)?;
            lexer.expect_space()?;
            let uids = read_uid_set(lexer)?;
            ResponseCode::AppendUid(AppendUid { uid_validity, uids })
        }
        "COPYUID" => {
            lexer.expect_space()?;
            let uid_validity = read_uid_validity(lexer)?;
            lexer.expect_space()?;
            let source = read_uid_set(lexer)?;
            lexer.expect_space()?;
            let destination = read_uid_set(lexer)?;
            ResponseCode::CopyUid(CopyUid {
                uid_validity,
                source,
                destination,
            })
        }
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    // Unknown codes may carry arbitrary arguments.
    while lexer.peek().is_some_and(|b| b != b']' && b != b'\r') {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

fn read_uid_validity(lexer: &mut Lexer<'_>) -> Result<UidValidity> {
    let n = lexer.read_number()?;
    UidValidity::new(n).ok_or_else(|| lexer.error("UIDVALIDITY cannot be 0"))
}

/// Reads a uid-set such as `304,319:320`, which lexes as a number when it is
/// a single UID and as an atom otherwise.
fn read_uid_set(lexer: &mut Lexer<'_>) -> Result<UidSet> {
    let text = match lexer.next_token()? {
        Token::Number(n) => n.to_string(),
        Token::Atom(s) => s.to_string(),
        token => return Err(lexer.error(&format!("expected uid-set, got {token:?}"))),
    };
    UidSet::parse(&text).ok_or_else(|| lexer.error(&format!("invalid uid-set: {text}")))
}

/// Parses space-separated capability atoms up to the end of the line or `]`.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.eat(b' ') {
        match lexer.next_token()? {
            Token::Atom(s) => caps.push(Capability::parse(s)),
            Token::Number(n) => caps.push(Capability::parse(&n.to_string())),
            token => return Err(lexer.error(&format!("unexpected token in capability list: {token:?}"))),
        }
    }

    Ok(caps)
}

/// Parses a parenthesized flag list. `\*` decodes as [`Flag::Wildcard`].
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;

    let mut flags = Flags::new();

    loop {
        if lexer.peek() == Some(b'\\') && lexer.peek_at(1) == Some(b'*') {
            lexer.skip(2);
            flags.insert(Flag::Wildcard);
            continue;
        }
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            Token::Space => {}
            token => return Err(lexer.error(&format!("unexpected token in flag list: {token:?}"))),
        }
    }

    Ok(flags)
}

/// Parses the body of a LIST or LSUB response.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            Token::Space => {}
            token => return Err(lexer.error(&format!("unexpected token in LIST attributes: {token:?}"))),
        }
    }

    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => return Err(lexer.error(&format!("expected delimiter, got {token:?}"))),
    };

    lexer.expect_space()?;
    let mailbox = Mailbox::new(lexer.read_astring()?);

    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox,
    })
}

/// Parses SEARCH data. A trailing `(MODSEQ n)` is ignored.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut nums = Vec::new();

    while lexer.eat(b' ') {
        match lexer.next_token()? {
            Token::Number(n) => {
                let n = u32::try_from(n).map_err(|_| lexer.error("SEARCH number exceeds 32 bits"))?;
                nums.push(n);
            }
            Token::LParen => {
                while lexer.peek().is_some_and(|b| b != b')' && b != b'\r') {
                    lexer.advance();
                }
                lexer.eat(b')');
            }
            Token::Crlf | Token::Eof => break,
            token => return Err(lexer.error(&format!("unexpected token in SEARCH: {token:?}"))),
        }
    }

    Ok(nums)
}

/// Parses the body of a STATUS response.
pub fn parse_status_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, MailboxStatus)> {
    let mailbox = Mailbox::new(lexer.read_astring()?);
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut status = MailboxStatus::default();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                lexer.expect_space()?;
                let value = lexer.read_number64()?;
                let value32 = u32::try_from(value).ok();
                match name.to_uppercase().as_str() {
                    "MESSAGES" => status.messages = value32,
                    "RECENT" => status.recent = value32,
                    "UIDNEXT" => status.uid_next = value32,
                    "UIDVALIDITY" => status.uid_validity = value32,
                    "UNSEEN" => status.unseen = value32,
                    // HIGHESTMODSEQ, SIZE and friends are not tracked.
                    _ => {}
                }
            }
            token => return Err(lexer.error(&format!("unexpected token in STATUS: {token:?}"))),
        }
    }

    Ok((mailbox, status))
}
