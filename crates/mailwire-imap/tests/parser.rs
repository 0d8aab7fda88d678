//! Response parser tests through the public API.

#![allow(clippy::unwrap_used)]

use mailwire_imap::parser::FetchItem;
use mailwire_imap::{
    Capability, Flag, Response, ResponseCode, ResponseParser, SequenceSet, Status, UntaggedResponse,
};

fn untagged(line: &[u8]) -> UntaggedResponse {
    match ResponseParser::parse(line).unwrap() {
        Response::Untagged(u) => u,
        other => panic!("Expected untagged response, got {other:?}"),
    }
}

#[test]
fn test_parser_capability() {
    let UntaggedResponse::Capability(caps) =
        untagged(b"* CAPABILITY IMAP4rev1 IDLE NAMESPACE AUTH=PLAIN\r\n")
    else {
        panic!("Expected capability response");
    };
    assert!(caps.contains(&Capability::Imap4Rev1));
    assert!(caps.contains(&Capability::Idle));
    assert!(caps.iter().any(|c| c.is_auth("plain")));
}

#[test]
fn test_parser_exists() {
    assert_eq!(untagged(b"* 23 EXISTS\r\n"), UntaggedResponse::Exists(23));
}

#[test]
fn test_parser_fetch_response() {
    match untagged(b"* 12 FETCH (FLAGS (\\Seen) UID 100)\r\n") {
        UntaggedResponse::Fetch { seq, items } => {
            assert_eq!(seq.get(), 12);
            assert!(matches!(&items[0], FetchItem::Flags(f) if f.is_seen()));
            assert!(matches!(&items[1], FetchItem::Uid(uid) if uid.get() == 100));
        }
        _ => panic!("Expected FETCH response"),
    }
}

#[test]
fn test_parser_fetch_literal_body() {
    match untagged(b"* 1 FETCH (UID 7 BODY[] {5}\r\nhello)\r\n") {
        UntaggedResponse::Fetch { items, .. } => {
            let body = items.iter().find_map(|item| match item {
                FetchItem::Body { data, .. } => data.clone(),
                _ => None,
            });
            assert_eq!(body.as_deref(), Some(&b"hello"[..]));
        }
        _ => panic!("Expected FETCH response"),
    }
}

#[test]
fn test_parser_list_response() {
    match untagged(b"* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n") {
        UntaggedResponse::List(list) => {
            assert_eq!(list.mailbox.as_str(), "INBOX");
            assert_eq!(list.delimiter, Some('/'));
        }
        _ => panic!("Expected LIST response"),
    }
}

#[test]
fn test_parser_tagged_ok() {
    match ResponseParser::parse(b"A001 OK LOGIN completed\r\n").unwrap() {
        Response::Tagged(completion) => {
            assert_eq!(completion.tag.as_str(), "A001");
            assert!(completion.status.is_ok());
            assert!(completion.text.contains("LOGIN"));
        }
        _ => panic!("Expected tagged response"),
    }
}

#[test]
fn test_parser_tagged_no_with_code() {
    match ResponseParser::parse(b"A002 NO [TRYCREATE] No such mailbox\r\n").unwrap() {
        Response::Tagged(completion) => {
            assert_eq!(completion.status, Status::No);
            assert_eq!(completion.code, Some(ResponseCode::TryCreate));
        }
        _ => panic!("Expected tagged response"),
    }
}

#[test]
fn test_parser_tagged_without_text() {
    match ResponseParser::parse(b"0003 OK [READ-WRITE]\r\n").unwrap() {
        Response::Tagged(completion) => {
            assert_eq!(completion.code, Some(ResponseCode::ReadWrite));
            assert!(completion.text.is_empty());
        }
        _ => panic!("Expected tagged response"),
    }
}

#[test]
fn test_parser_continuation() {
    assert_eq!(
        ResponseParser::parse(b"+ idling\r\n").unwrap(),
        Response::Continuation {
            text: Some("idling".to_string())
        }
    );
    assert_eq!(
        ResponseParser::parse(b"+\r\n").unwrap(),
        Response::Continuation { text: None }
    );
}

#[test]
fn test_parser_unknown_is_tolerated() {
    match untagged(b"* XAPPLEPUSHSERVICE aps-version 2\r\n") {
        UntaggedResponse::Unknown { keyword, raw } => {
            assert_eq!(keyword, "XAPPLEPUSHSERVICE");
            assert!(raw.contains("aps-version"));
        }
        _ => panic!("Expected unknown response"),
    }
}

#[test]
fn test_parser_rejects_garbage() {
    assert!(ResponseParser::parse(b"\r\n").is_err());
}

#[test]
fn test_parser_oversized_literal_is_an_error() {
    let result = ResponseParser::parse(b"* 1 FETCH (BODY[] {18446744073709551615}\r\nabc)\r\n");
    assert!(result.is_err());
}

#[test]
fn test_sequence_set_display() {
    let seq = SequenceSet::range(1, 10).unwrap();
    assert_eq!(seq.to_string(), "1:10");
    assert_eq!(SequenceSet::All.to_string(), "1:*");
}

#[test]
fn test_flags_parsing() {
    assert_eq!(Flag::parse("\\Seen"), Flag::Seen);
    assert_eq!(Flag::parse("\\Flagged"), Flag::Flagged);
    assert_eq!(Flag::parse("\\Deleted"), Flag::Deleted);
    assert_eq!(Flag::parse("\\Draft"), Flag::Draft);
    assert_eq!(Flag::parse("\\Answered"), Flag::Answered);
    assert_eq!(Flag::parse("\\Recent"), Flag::Recent);

    // Custom keyword flag
    match Flag::parse("$Important") {
        Flag::Keyword(s) => assert_eq!(s, "$Important"),
        _ => panic!("Expected keyword flag"),
    }
}

#[test]
fn test_capability_parsing() {
    assert_eq!(Capability::parse("IMAP4rev1"), Capability::Imap4Rev1);
    assert_eq!(Capability::parse("IDLE"), Capability::Idle);
    assert_eq!(Capability::parse("MOVE"), Capability::Move);
    assert_eq!(Capability::parse("SASL-IR"), Capability::SaslIr);

    // Auth mechanism
    match Capability::parse("AUTH=PLAIN") {
        Capability::Auth(mech) => assert_eq!(mech, "PLAIN"),
        _ => panic!("Expected AUTH capability"),
    }
}
