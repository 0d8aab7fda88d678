//! IMAP response classifier.
//!
//! Splits one complete server response into its category (tagged
//! completion, untagged data, or continuation request) and decodes untagged
//! data into a typed [`UntaggedResponse`].

#![allow(clippy::missing_errors_doc)]

mod extensions;
mod fetch;
mod helpers;
mod types;

pub use types::{Address, BodyStructure, Envelope, FetchItem, UntaggedResponse};

use crate::parser::lexer::{Lexer, Token, is_atom_char};
use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::{Error, Result};

pub(crate) use helpers::parse_flag_list;

/// Tagged completion of a command (`<tag> OK|NO|BAD ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Tag echoed by the server.
    pub tag: Tag,
    /// Completion status.
    pub status: Status,
    /// Optional bracketed response code.
    pub code: Option<ResponseCode>,
    /// Human-readable text.
    pub text: String,
}

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged(Completion),
    /// Untagged response (server data).
    Untagged(UntaggedResponse),
    /// Continuation request.
    Continuation {
        /// Text after `+ `, if any.
        text: Option<String>,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response, literals included.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.peek() {
            Some(b'*') => {
                lexer.advance();
                Self::parse_untagged(&mut lexer, input)
            }
            Some(b'+') => {
                lexer.advance();
                Ok(Self::parse_continuation(&mut lexer))
            }
            Some(_) => Self::parse_tagged(&mut lexer),
            None => Err(Error::Parse {
                position: 0,
                message: "empty response".to_string(),
            }),
        }
    }

    /// Reads the tag byte-wise so zero padding survives.
    fn parse_tagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        let start = lexer.position();
        while lexer.peek().is_some_and(|b| is_atom_char(b) && b != b'+') {
            lexer.advance();
        }
        let tag_bytes = lexer.consumed_since(start);
        if tag_bytes.is_empty() {
            return Err(lexer.error("expected *, +, or tag"));
        }
        let tag = Tag::new(String::from_utf8_lossy(tag_bytes).into_owned());

        lexer.expect_space()?;
        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged(Completion {
            tag,
            status,
            code,
            text,
        }))
    }

    fn parse_untagged(lexer: &mut Lexer<'_>, input: &[u8]) -> Result<Response> {
        lexer.expect_space()?;
        let raw_start = lexer.position();

        let untagged = match lexer.next_token()? {
            Token::Atom(keyword) => Self::parse_untagged_keyword(lexer, keyword)?,
            Token::Number(n) => {
                lexer.expect_space()?;
                let keyword = lexer.read_atom_string()?;
                Self::parse_message_data(lexer, n, keyword)?
            }
            token => return Err(lexer.error(&format!("unexpected token after '*': {token:?}"))),
        };

        Ok(Response::Untagged(untagged.unwrap_or_else(|| {
            let raw = String::from_utf8_lossy(&input[raw_start..]);
            let raw = raw.trim_end_matches("\r\n").to_string();
            let keyword = raw
                .split(' ')
                .find(|w| !w.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or_default()
                .to_string();
            UntaggedResponse::Unknown { keyword, raw }
        })))
    }

    /// Decodes `* <keyword> ...`. Returns `None` for unknown keywords.
    fn parse_untagged_keyword(
        lexer: &mut Lexer<'_>,
        keyword: &str,
    ) -> Result<Option<UntaggedResponse>> {
        let upper = keyword.to_uppercase();

        if let Some(status) = match upper.as_str() {
            "OK" => Some(Status::Ok),
            "NO" => Some(Status::No),
            "BAD" => Some(Status::Bad),
            "PREAUTH" => Some(Status::PreAuth),
            "BYE" => Some(Status::Bye),
            _ => None,
        } {
            let (code, text) = Self::parse_resp_text(lexer)?;
            return Ok(Some(UntaggedResponse::Condition { status, code, text }));
        }

        let response = match upper.as_str() {
            "CAPABILITY" => UntaggedResponse::Capability(helpers::parse_capability_data(lexer)?),
            "ENABLED" => UntaggedResponse::Enabled(helpers::parse_capability_data(lexer)?),
            "FLAGS" => {
                lexer.expect_space()?;
                UntaggedResponse::Flags(parse_flag_list(lexer)?)
            }
            "LIST" => {
                lexer.expect_space()?;
                UntaggedResponse::List(helpers::parse_list_response(lexer)?)
            }
            "LSUB" => {
                lexer.expect_space()?;
                UntaggedResponse::LSub(helpers::parse_list_response(lexer)?)
            }
            "SEARCH" => UntaggedResponse::Search(helpers::parse_search_response(lexer)?),
            "STATUS" => {
                lexer.expect_space()?;
                let (mailbox, status) = helpers::parse_status_response(lexer)?;
                UntaggedResponse::Status { mailbox, status }
            }
            "ACL" => {
                lexer.expect_space()?;
                UntaggedResponse::Acl(extensions::parse_acl(lexer)?)
            }
            "LISTRIGHTS" => {
                lexer.expect_space()?;
                UntaggedResponse::ListRights(extensions::parse_list_rights(lexer)?)
            }
            "MYRIGHTS" => {
                lexer.expect_space()?;
                UntaggedResponse::MyRights(extensions::parse_my_rights(lexer)?)
            }
            "QUOTA" => {
                lexer.expect_space()?;
                UntaggedResponse::Quota(extensions::parse_quota(lexer)?)
            }
            "QUOTAROOT" => {
                lexer.expect_space()?;
                UntaggedResponse::QuotaRoot(extensions::parse_quota_root(lexer)?)
            }
            "NAMESPACE" => {
                lexer.expect_space()?;
                UntaggedResponse::Namespace(extensions::parse_namespace(lexer)?)
            }
            _ => return Ok(None),
        };

        Ok(Some(response))
    }

    /// Decodes `* <n> <keyword> ...`. Returns `None` for unknown keywords.
    fn parse_message_data(
        lexer: &mut Lexer<'_>,
        n: u64,
        keyword: &str,
    ) -> Result<Option<UntaggedResponse>> {
        let n = u32::try_from(n).map_err(|_| lexer.error("message number exceeds 32 bits"))?;
        let seq = || SeqNum::new(n).ok_or_else(|| lexer.error("sequence number cannot be 0"));

        let response = match keyword.to_uppercase().as_str() {
            "EXISTS" => UntaggedResponse::Exists(n),
            "RECENT" => UntaggedResponse::Recent(n),
            "EXPUNGE" => UntaggedResponse::Expunge(seq()?),
            "FETCH" => {
                let seq = seq()?;
                lexer.expect_space()?;
                let items = fetch::parse_fetch_response(lexer)?;
                UntaggedResponse::Fetch { seq, items }
            }
            _ => return Ok(None),
        };

        Ok(Some(response))
    }

    /// Parses a continuation request. The text is kept verbatim.
    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        lexer.eat(b' ');
        let text = lexer.rest_of_line();
        Response::Continuation {
            text: (!text.is_empty()).then_some(text),
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom_string()?;
        match s.to_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(lexer.error(&format!("invalid status: {s}"))),
        }
    }

    /// Parses `[SP [code] [SP text]]` up to and including CRLF.
    ///
    /// Servers that omit the text after the status keyword are accepted.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        lexer.eat(b' ');

        let code = if lexer.peek() == Some(b'[') {
            Some(helpers::parse_response_code(lexer)?)
        } else {
            None
        };

        lexer.eat(b' ');
        Ok((code, lexer.rest_of_line()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::types::{Capability, Flag, MailboxAttribute, ResponseCode};

    use super::*;

    fn untagged(input: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(input).unwrap() {
            Response::Untagged(u) => u,
            other => panic!("expected untagged, got {other:?}"),
        }
    }

    #[test]
    fn greeting() {
        assert_eq!(
            untagged(b"* OK ready\r\n"),
            UntaggedResponse::Condition {
                status: Status::Ok,
                code: None,
                text: "ready".to_string(),
            }
        );
    }

    #[test]
    fn greeting_with_capability_code() {
        let UntaggedResponse::Condition { code, text, .. } =
            untagged(b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=PLAIN] Dovecot ready.\r\n")
        else {
            panic!("expected condition");
        };
        let Some(ResponseCode::Capability(caps)) = code else {
            panic!("expected capability code");
        };
        assert!(caps.contains(&Capability::SaslIr));
        assert!(caps.contains(&Capability::Auth("PLAIN".to_string())));
        assert_eq!(text, "Dovecot ready.");
    }

    #[test]
    fn tagged_keeps_zero_padding() {
        let Response::Tagged(done) = ResponseParser::parse(b"00001 OK LOGIN completed\r\n").unwrap()
        else {
            panic!("expected tagged");
        };
        assert_eq!(done.tag.as_str(), "00001");
        assert_eq!(done.status, Status::Ok);
        assert_eq!(done.text, "LOGIN completed");
    }

    #[test]
    fn tagged_without_text() {
        let Response::Tagged(done) = ResponseParser::parse(b"0002 OK\r\n").unwrap() else {
            panic!("expected tagged");
        };
        assert_eq!(done.tag.as_str(), "0002");
        assert!(done.text.is_empty());
        assert!(done.code.is_none());
    }

    #[test]
    fn tagged_code_only() {
        let Response::Tagged(done) = ResponseParser::parse(b"0003 OK [READ-WRITE]\r\n").unwrap()
        else {
            panic!("expected tagged");
        };
        assert_eq!(done.code, Some(ResponseCode::ReadWrite));
    }

    #[test]
    fn tagged_no_with_trycreate() {
        let Response::Tagged(done) =
            ResponseParser::parse(b"A7 NO [TRYCREATE] Mailbox doesn't exist\r\n").unwrap()
        else {
            panic!("expected tagged");
        };
        assert_eq!(done.status, Status::No);
        assert_eq!(done.code, Some(ResponseCode::TryCreate));
    }

    #[test]
    fn capability_data() {
        let UntaggedResponse::Capability(caps) =
            untagged(b"* CAPABILITY IMAP4rev1 IDLE NAMESPACE\r\n")
        else {
            panic!("expected capability");
        };
        assert_eq!(
            caps,
            vec![Capability::Imap4Rev1, Capability::Idle, Capability::Namespace]
        );
    }

    #[test]
    fn message_counters() {
        assert_eq!(untagged(b"* 23 EXISTS\r\n"), UntaggedResponse::Exists(23));
        assert_eq!(untagged(b"* 0 RECENT\r\n"), UntaggedResponse::Recent(0));
        assert_eq!(
            untagged(b"* 4 EXPUNGE\r\n"),
            UntaggedResponse::Expunge(SeqNum::new(4).unwrap())
        );
    }

    #[test]
    fn expunge_zero_is_an_error() {
        assert!(ResponseParser::parse(b"* 0 EXPUNGE\r\n").is_err());
    }

    #[test]
    fn flags_and_permanent_flags() {
        let UntaggedResponse::Flags(flags) = untagged(b"* FLAGS (\\Seen \\Deleted)\r\n") else {
            panic!("expected flags");
        };
        assert!(flags.contains(&Flag::Seen));
        assert!(flags.contains(&Flag::Deleted));
        assert_eq!(flags.len(), 2);

        let UntaggedResponse::Condition { code, .. } =
            untagged(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n")
        else {
            panic!("expected condition");
        };
        let Some(ResponseCode::PermanentFlags(perm)) = code else {
            panic!("expected PERMANENTFLAGS");
        };
        assert!(perm.contains(&Flag::Wildcard));
    }

    #[test]
    fn list_and_lsub() {
        let UntaggedResponse::List(list) = untagged(b"* LIST (\\HasChildren) \"/\" \"INBOX\"\r\n")
        else {
            panic!("expected list");
        };
        assert!(list.attributes.contains(&MailboxAttribute::HasChildren));
        assert_eq!(list.delimiter, Some('/'));
        assert_eq!(list.mailbox.as_str(), "INBOX");

        let UntaggedResponse::LSub(lsub) = untagged(b"* LSUB () \".\" #news.comp\r\n") else {
            panic!("expected lsub");
        };
        assert_eq!(lsub.mailbox.as_str(), "#news.comp");
    }

    #[test]
    fn list_with_literal_name() {
        let UntaggedResponse::List(list) = untagged(b"* LIST () \"/\" {7}\r\nA \"b\" c\r\n") else {
            panic!("expected list");
        };
        assert_eq!(list.mailbox.as_str(), "A \"b\" c");
    }

    #[test]
    fn status_data() {
        let UntaggedResponse::Status { mailbox, status } =
            untagged(b"* STATUS blurdybloop (MESSAGES 231 UIDNEXT 44292)\r\n")
        else {
            panic!("expected status");
        };
        assert_eq!(mailbox.as_str(), "blurdybloop");
        assert_eq!(status.messages, Some(231));
        assert_eq!(status.uid_next, Some(44292));
        assert_eq!(status.unseen, None);
    }

    #[test]
    fn search_data() {
        assert_eq!(
            untagged(b"* SEARCH 2 84 882\r\n"),
            UntaggedResponse::Search(vec![2, 84, 882])
        );
        assert_eq!(untagged(b"* SEARCH\r\n"), UntaggedResponse::Search(vec![]));
    }

    #[test]
    fn continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready for literal\r\n").unwrap(),
            Response::Continuation {
                text: Some("Ready for literal".to_string())
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: None }
        );
        assert_eq!(
            ResponseParser::parse(b"+ \r\n").unwrap(),
            Response::Continuation { text: None }
        );
    }

    #[test]
    fn copyuid_and_appenduid_codes() {
        let Response::Tagged(done) =
            ResponseParser::parse(b"A3 OK [COPYUID 38505 304,319:320 3956:3958] Done\r\n")
                .unwrap()
        else {
            panic!("expected tagged");
        };
        let Some(ResponseCode::CopyUid(copy)) = done.code else {
            panic!("expected COPYUID");
        };
        assert_eq!(copy.uid_validity.get(), 38505);
        assert_eq!(copy.pairs().len(), 3);

        let Response::Tagged(done) =
            ResponseParser::parse(b"A4 OK [APPENDUID 38505 3955] APPEND completed\r\n").unwrap()
        else {
            panic!("expected tagged");
        };
        let Some(ResponseCode::AppendUid(append)) = done.code else {
            panic!("expected APPENDUID");
        };
        assert_eq!(append.uids.to_vec()[0].get(), 3955);
    }

    #[test]
    fn unknown_code_is_kept() {
        let UntaggedResponse::Condition { code, text, .. } =
            untagged(b"* OK [HIGHESTMODSEQ 715194045007] Highest\r\n")
        else {
            panic!("expected condition");
        };
        assert_eq!(code, Some(ResponseCode::Unknown("HIGHESTMODSEQ".to_string())));
        assert_eq!(text, "Highest");
    }

    #[test]
    fn zero_valued_codes_become_unknown() {
        for (line, keyword) in [
            (&b"* OK [UNSEEN 0] No unseen\r\n"[..], "UNSEEN"),
            (b"* OK [UIDNEXT 0] Predicted next UID\r\n", "UIDNEXT"),
            (b"* OK [UIDVALIDITY 0] UIDs valid\r\n", "UIDVALIDITY"),
        ] {
            let UntaggedResponse::Condition { code, .. } = untagged(line) else {
                panic!("expected condition");
            };
            assert_eq!(code, Some(ResponseCode::Unknown(keyword.to_string())));
        }
    }

    #[test]
    fn unknown_untagged_is_tolerated() {
        assert_eq!(
            untagged(b"* XSTATE busy now\r\n"),
            UntaggedResponse::Unknown {
                keyword: "XSTATE".to_string(),
                raw: "XSTATE busy now".to_string(),
            }
        );
        assert_eq!(
            untagged(b"* 3 XWHATEVER (1 2)\r\n"),
            UntaggedResponse::Unknown {
                keyword: "XWHATEVER".to_string(),
                raw: "3 XWHATEVER (1 2)".to_string(),
            }
        );
    }

    #[test]
    fn extension_responses() {
        assert!(matches!(
            untagged(b"* ACL INBOX bob lrswipkxtea\r\n"),
            UntaggedResponse::Acl(_)
        ));
        assert!(matches!(
            untagged(b"* MYRIGHTS INBOX lr\r\n"),
            UntaggedResponse::MyRights(_)
        ));
        assert!(matches!(
            untagged(b"* QUOTAROOT INBOX \"\"\r\n"),
            UntaggedResponse::QuotaRoot(_)
        ));
        assert!(matches!(
            untagged(b"* QUOTA \"\" (STORAGE 10 512)\r\n"),
            UntaggedResponse::Quota(_)
        ));
        assert!(matches!(
            untagged(b"* NAMESPACE ((\"\" \"/\")) NIL NIL\r\n"),
            UntaggedResponse::Namespace(_)
        ));
        assert_eq!(
            untagged(b"* ENABLED CONDSTORE\r\n"),
            UntaggedResponse::Enabled(vec![Capability::CondStore])
        );
    }

    #[test]
    fn fetch_with_literal() {
        let UntaggedResponse::Fetch { seq, items } =
            untagged(b"* 12 FETCH (UID 5 BODY[] {11}\r\nhello\r\nworld)\r\n")
        else {
            panic!("expected fetch");
        };
        assert_eq!(seq.get(), 12);
        assert!(
            matches!(&items[1], FetchItem::Body { data: Some(d), .. } if d == b"hello\r\nworld")
        );
    }

    #[test]
    fn malformed_known_response_is_an_error() {
        assert!(ResponseParser::parse(b"* LIST garbage\r\n").is_err());
        assert!(ResponseParser::parse(b"\r\n").is_err());
    }
}
