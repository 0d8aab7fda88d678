//! IMAP response parser.
//!
//! A sans-I/O decoder for complete server responses as delivered by the
//! framing layer (one line, with any literals already read and inlined).
//!
//! - **Lexer**: tokenizes raw bytes into atoms, strings, literals, numbers.
//! - **Response parser**: classifies a response as tagged, untagged, or
//!   continuation and decodes untagged data into [`UntaggedResponse`].
//!
//! # Example
//!
//! ```
//! use mailwire_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* 3 EXISTS\r\n").unwrap();
//! assert_eq!(response, Response::Untagged(UntaggedResponse::Exists(3)));
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{
    Address, BodyStructure, Completion, Envelope, FetchItem, Response, ResponseParser,
    UntaggedResponse,
};
