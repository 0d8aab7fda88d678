//! Connection-wide handler for unsolicited responses.
//!
//! Servers may send EXISTS, EXPUNGE, FETCH and similar data at any time,
//! interleaved with the responses to whatever command is running. The
//! client feeds every untagged response to the installed handler after it
//! has updated its own state, then to the per-command callback, if any.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::parser::{Completion, FetchItem, UntaggedResponse};
use crate::types::{Flags, ResponseCode, SeqNum, Status};

/// Handler for unsolicited server responses.
///
/// All methods default to doing nothing.
pub trait ResponseHandler: Send {
    /// Message count changed (`EXISTS`).
    fn on_exists(&mut self, count: u32) {
        let _ = count;
    }

    /// A message was expunged. Later sequence numbers shift down by one.
    fn on_expunge(&mut self, seq: SeqNum) {
        let _ = seq;
    }

    /// Message data changed, typically flags set by another client.
    fn on_fetch(&mut self, seq: SeqNum, items: &[FetchItem]) {
        let _ = (seq, items);
    }

    /// The folder's defined flags changed.
    fn on_flags(&mut self, flags: &Flags) {
        let _ = flags;
    }

    /// Recent count changed.
    fn on_recent(&mut self, count: u32) {
        let _ = count;
    }

    /// The server is closing the connection.
    fn on_bye(&mut self, text: &str) {
        let _ = text;
    }

    /// `[ALERT]` text, which must be shown to the user.
    fn on_alert(&mut self, text: &str) {
        let _ = text;
    }

    /// An untagged response the decoder did not recognize.
    fn on_unknown(&mut self, raw: &str) {
        let _ = raw;
    }
}

/// Routes one untagged response to the matching handler method.
pub(crate) fn dispatch(handler: &mut dyn ResponseHandler, response: &UntaggedResponse) {
    match response {
        UntaggedResponse::Exists(n) => handler.on_exists(*n),
        UntaggedResponse::Recent(n) => handler.on_recent(*n),
        UntaggedResponse::Expunge(seq) => handler.on_expunge(*seq),
        UntaggedResponse::Fetch { seq, items } => handler.on_fetch(*seq, items),
        UntaggedResponse::Flags(flags) => handler.on_flags(flags),
        UntaggedResponse::Condition {
            status: Status::Bye,
            text,
            ..
        } => handler.on_bye(text),
        UntaggedResponse::Condition {
            code: Some(ResponseCode::Alert),
            text,
            ..
        } => handler.on_alert(text),
        UntaggedResponse::Unknown { raw, .. } => handler.on_unknown(raw),
        _ => {}
    }
}

/// Routes the parts of a tagged completion a handler must see. Only
/// `[ALERT]` qualifies.
pub(crate) fn dispatch_completion(handler: &mut dyn ResponseHandler, completion: &Completion) {
    if completion.code == Some(ResponseCode::Alert) {
        handler.on_alert(&completion.text);
    }
}

/// A handler that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl ResponseHandler for NoopHandler {}

/// A handler that records events, for batch processing or tests.
#[derive(Debug, Default, Clone)]
pub struct CollectingHandler {
    /// Collected events.
    pub events: Vec<UnsolicitedEvent>,
}

impl CollectingHandler {
    /// Creates an empty handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes all collected events, leaving the handler empty.
    pub fn take(&mut self) -> Vec<UnsolicitedEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ResponseHandler for CollectingHandler {
    fn on_exists(&mut self, count: u32) {
        self.events.push(UnsolicitedEvent::Exists(count));
    }

    fn on_expunge(&mut self, seq: SeqNum) {
        self.events.push(UnsolicitedEvent::Expunge(seq));
    }

    fn on_fetch(&mut self, seq: SeqNum, items: &[FetchItem]) {
        self.events.push(UnsolicitedEvent::Fetch(seq, items.to_vec()));
    }

    fn on_flags(&mut self, flags: &Flags) {
        self.events.push(UnsolicitedEvent::Flags(flags.clone()));
    }

    fn on_recent(&mut self, count: u32) {
        self.events.push(UnsolicitedEvent::Recent(count));
    }

    fn on_bye(&mut self, text: &str) {
        self.events.push(UnsolicitedEvent::Bye(text.to_string()));
    }

    fn on_alert(&mut self, text: &str) {
        self.events.push(UnsolicitedEvent::Alert(text.to_string()));
    }

    fn on_unknown(&mut self, raw: &str) {
        self.events.push(UnsolicitedEvent::Unknown(raw.to_string()));
    }
}

/// Shares a handler with the caller, who keeps the other clone to inspect
/// it. A poisoned lock is taken over as is.
impl<H: ResponseHandler> ResponseHandler for Arc<Mutex<H>> {
    fn on_exists(&mut self, count: u32) {
        lock(self).on_exists(count);
    }

    fn on_expunge(&mut self, seq: SeqNum) {
        lock(self).on_expunge(seq);
    }

    fn on_fetch(&mut self, seq: SeqNum, items: &[FetchItem]) {
        lock(self).on_fetch(seq, items);
    }

    fn on_flags(&mut self, flags: &Flags) {
        lock(self).on_flags(flags);
    }

    fn on_recent(&mut self, count: u32) {
        lock(self).on_recent(count);
    }

    fn on_bye(&mut self, text: &str) {
        lock(self).on_bye(text);
    }

    fn on_alert(&mut self, text: &str) {
        lock(self).on_alert(text);
    }

    fn on_unknown(&mut self, raw: &str) {
        lock(self).on_unknown(raw);
    }
}

fn lock<H>(shared: &Mutex<H>) -> MutexGuard<'_, H> {
    shared
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// An event recorded by [`CollectingHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum UnsolicitedEvent {
    /// EXISTS.
    Exists(u32),
    /// EXPUNGE.
    Expunge(SeqNum),
    /// FETCH.
    Fetch(SeqNum, Vec<FetchItem>),
    /// FLAGS.
    Flags(Flags),
    /// RECENT.
    Recent(u32),
    /// BYE.
    Bye(String),
    /// ALERT.
    Alert(String),
    /// Unrecognized response.
    Unknown(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::{Response, ResponseParser};

    fn feed(handler: &mut CollectingHandler, line: &[u8]) {
        let Response::Untagged(u) = ResponseParser::parse(line).unwrap() else {
            panic!("expected untagged");
        };
        dispatch(handler, &u);
    }

    #[test]
    fn dispatch_routes_by_kind() {
        let mut handler = CollectingHandler::new();
        feed(&mut handler, b"* 5 EXISTS\r\n");
        feed(&mut handler, b"* 2 EXPUNGE\r\n");
        feed(&mut handler, b"* OK [ALERT] Maintenance at noon\r\n");
        feed(&mut handler, b"* XFOO bar\r\n");
        feed(&mut handler, b"* BYE idle too long\r\n");
        feed(&mut handler, b"* LIST () \"/\" INBOX\r\n");

        assert_eq!(
            handler.take(),
            vec![
                UnsolicitedEvent::Exists(5),
                UnsolicitedEvent::Expunge(SeqNum::new(2).unwrap()),
                UnsolicitedEvent::Alert("Maintenance at noon".to_string()),
                UnsolicitedEvent::Unknown("XFOO bar".to_string()),
                UnsolicitedEvent::Bye("idle too long".to_string()),
            ]
        );
        assert!(handler.events.is_empty());
    }

    #[test]
    fn tagged_alert_reaches_handler() {
        let mut handler = CollectingHandler::new();
        for line in [
            &b"00003 NO [ALERT] Password expires soon\r\n"[..],
            b"00004 OK [READ-WRITE] done\r\n",
        ] {
            let Response::Tagged(completion) = ResponseParser::parse(line).unwrap() else {
                panic!("expected tagged");
            };
            dispatch_completion(&mut handler, &completion);
        }
        assert_eq!(
            handler.take(),
            vec![UnsolicitedEvent::Alert("Password expires soon".to_string())]
        );
    }

    #[test]
    fn shared_handler_stays_readable() {
        let shared = Arc::new(Mutex::new(CollectingHandler::new()));
        let mut installed = Arc::clone(&shared);
        let Response::Untagged(u) = ResponseParser::parse(b"* 3 RECENT\r\n").unwrap() else {
            panic!("expected untagged");
        };
        dispatch(&mut installed, &u);
        assert_eq!(
            shared.lock().unwrap().take(),
            vec![UnsolicitedEvent::Recent(3)]
        );
    }
}
