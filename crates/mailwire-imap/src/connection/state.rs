//! Connection and folder state.
//!
//! Updated as a side effect of every response the pipeline reads, before
//! any handler or callback sees it.

use tracing::{debug, warn};

use crate::parser::{Completion, UntaggedResponse};
use crate::types::{Capability, Flags, ResponseCode, SelectedFolder, Status};

/// Coarse connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Greeting received, no identity yet.
    NotAuthenticated,
    /// Logged in, no folder selected.
    Authenticated,
    /// Logged in with a folder selected.
    Selected,
    /// Logged out, closed by the server, or broken. No command can be sent.
    Closed,
}

/// Who the connection is authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User name. Empty when the server authenticated the connection
    /// itself with a PREAUTH greeting.
    pub username: String,
    /// `LOGIN`, a SASL mechanism name, or `PREAUTH`.
    pub mechanism: String,
}

/// Mutable per-connection state.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    capabilities: Vec<Capability>,
    greeting: Option<String>,
    identity: Option<Identity>,
    selected: Option<SelectedFolder>,
    bye: Option<String>,
}

impl ConnectionState {
    /// Creates the state of a connection whose greeting is not yet read.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Greeting text.
    #[must_use]
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    /// Authenticated identity.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Selected folder.
    #[must_use]
    pub const fn selected(&self) -> Option<&SelectedFolder> {
        self.selected.as_ref()
    }

    /// Text of an untagged BYE, once one has arrived.
    #[must_use]
    pub fn bye(&self) -> Option<&str> {
        self.bye.as_deref()
    }

    /// Phase implied by identity and selection.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match (&self.identity, &self.selected) {
            (None, _) => Phase::NotAuthenticated,
            (Some(_), None) => Phase::Authenticated,
            (Some(_), Some(_)) => Phase::Selected,
        }
    }

    pub(crate) fn set_greeting(&mut self, text: String) {
        self.greeting = Some(text);
    }

    pub(crate) fn authenticate(&mut self, username: &str, mechanism: &str) {
        debug!(username, mechanism, "authenticated");
        self.identity = Some(Identity {
            username: username.to_string(),
            mechanism: mechanism.to_string(),
        });
    }

    /// Starts a SELECT or EXAMINE, dropping any previous selection.
    pub(crate) fn begin_select(&mut self, folder: SelectedFolder) {
        if let Some(old) = self.selected.take() {
            debug!(folder = %old.name, "deselected");
        }
        self.selected = Some(folder);
    }

    pub(crate) fn deselect(&mut self) {
        if let Some(old) = self.selected.take() {
            debug!(folder = %old.name, "deselected");
        }
    }

    pub(crate) fn clear_capabilities(&mut self) {
        debug!("capability cache cleared");
        self.capabilities.clear();
    }

    /// Returns everything to the state of a fresh connection.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    fn replace_capabilities(&mut self, capabilities: &[Capability]) {
        debug!(count = capabilities.len(), "capabilities replaced");
        self.capabilities = capabilities.to_vec();
    }

    /// Applies the side effects of one untagged response.
    pub fn apply(&mut self, response: &UntaggedResponse) {
        match response {
            UntaggedResponse::Condition { status, code, text } => {
                if *status == Status::Bye {
                    warn!(text = %text, "server sent BYE");
                    self.bye = Some(text.clone());
                }
                if let Some(code) = code {
                    self.apply_code(code, text);
                }
            }
            UntaggedResponse::Capability(caps) => self.replace_capabilities(caps),
            UntaggedResponse::Flags(flags) => {
                if let Some(folder) = self.selected.as_mut() {
                    folder.flags = flags.clone();
                }
            }
            UntaggedResponse::Exists(n) => {
                if let Some(folder) = self.selected.as_mut() {
                    folder.exists = *n;
                }
            }
            UntaggedResponse::Recent(n) => {
                if let Some(folder) = self.selected.as_mut() {
                    folder.recent = *n;
                }
            }
            UntaggedResponse::Unknown { keyword, .. } => {
                warn!(keyword = %keyword, "ignoring unrecognized untagged response");
            }
            UntaggedResponse::Enabled(_)
            | UntaggedResponse::List(_)
            | UntaggedResponse::LSub(_)
            | UntaggedResponse::Status { .. }
            | UntaggedResponse::Search(_)
            | UntaggedResponse::Expunge(_)
            | UntaggedResponse::Fetch { .. }
            | UntaggedResponse::Acl(_)
            | UntaggedResponse::ListRights(_)
            | UntaggedResponse::MyRights(_)
            | UntaggedResponse::Quota(_)
            | UntaggedResponse::QuotaRoot(_)
            | UntaggedResponse::Namespace(_) => {}
        }
    }

    /// Applies the response code of a tagged completion.
    pub fn apply_completion(&mut self, completion: &Completion) {
        if let Some(code) = &completion.code {
            self.apply_code(code, &completion.text);
        }
    }

    fn apply_code(&mut self, code: &ResponseCode, text: &str) {
        match code {
            ResponseCode::Capability(caps) => {
                self.replace_capabilities(caps);
                return;
            }
            ResponseCode::Alert => {
                warn!(text, "server alert");
                return;
            }
            ResponseCode::PermanentFlags(_)
            | ResponseCode::ReadOnly
            | ResponseCode::ReadWrite
            | ResponseCode::UidNext(_)
            | ResponseCode::UidValidity(_)
            | ResponseCode::Unseen(_) => {}
            _ => return,
        }

        let Some(folder) = self.selected.as_mut() else {
            warn!(?code, "folder response code outside a selection");
            return;
        };
        match code {
            ResponseCode::PermanentFlags(flags) => {
                folder.permanent_flags = flags.iter().cloned().collect::<Flags>();
            }
            ResponseCode::ReadOnly => folder.read_only = true,
            ResponseCode::ReadWrite => folder.read_only = false,
            ResponseCode::UidNext(uid) => folder.uid_next = Some(*uid),
            ResponseCode::UidValidity(v) => folder.uid_validity = Some(*v),
            ResponseCode::Unseen(seq) => folder.first_unseen = Some(*seq),
            _ => {}
        }
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
    use crate::parser::{Response, ResponseParser};
    use crate::types::{Flag, Mailbox, SeqNum, Uid, UidValidity};

    fn apply(state: &mut ConnectionState, line: &[u8]) {
        match ResponseParser::parse(line).unwrap() {
            Response::Untagged(u) => state.apply(&u),
            Response::Tagged(c) => state.apply_completion(&c),
            Response::Continuation { .. } => panic!("continuation"),
        }
    }

    fn selected_state() -> ConnectionState {
        let mut state = ConnectionState::new();
        state.authenticate("bob", "LOGIN");
        state.begin_select(SelectedFolder::new(Mailbox::inbox(), false));
        state
    }

    #[test]
    fn select_data_fills_folder() {
        let mut state = selected_state();
        apply(&mut state, b"* 172 EXISTS\r\n");
        apply(&mut state, b"* 1 RECENT\r\n");
        apply(&mut state, b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n");
        apply(&mut state, b"* OK [UNSEEN 12] Message 12 is first unseen\r\n");
        apply(&mut state, b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n");
        apply(&mut state, b"* OK [UIDNEXT 4392] Predicted next UID\r\n");
        apply(&mut state, b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n");
        apply(&mut state, b"00002 OK [READ-ONLY] SELECT completed\r\n");

        let folder = state.selected().unwrap();
        assert_eq!(folder.exists, 172);
        assert_eq!(folder.recent, 1);
        assert_eq!(folder.flags.len(), 5);
        assert_eq!(folder.first_unseen, SeqNum::new(12));
        assert_eq!(folder.uid_validity, UidValidity::new(3857529045));
        assert_eq!(folder.uid_next, Uid::new(4392));
        assert!(folder.permanent_flags.contains(&Flag::Wildcard));
        assert!(folder.read_only);
        assert_eq!(state.phase(), Phase::Selected);
    }

    #[test]
    fn expunge_does_not_decrement_exists() {
        let mut state = selected_state();
        apply(&mut state, b"* 3 EXISTS\r\n");
        apply(&mut state, b"* 2 EXPUNGE\r\n");
        assert_eq!(state.selected().unwrap().exists, 3);
    }

    #[test]
    fn folder_codes_ignored_without_selection() {
        let mut state = ConnectionState::new();
        apply(&mut state, b"* OK [UIDNEXT 5] ignored\r\n");
        apply(&mut state, b"* 4 EXISTS\r\n");
        assert!(state.selected().is_none());
        assert_eq!(state.phase(), Phase::NotAuthenticated);
    }

    #[test]
    fn capability_replaces_not_merges() {
        let mut state = ConnectionState::new();
        apply(&mut state, b"* CAPABILITY IMAP4rev1 STARTTLS\r\n");
        apply(&mut state, b"* CAPABILITY IMAP4rev1 AUTH=PLAIN\r\n");
        assert_eq!(
            state.capabilities(),
            &[Capability::Imap4Rev1, Capability::Auth("PLAIN".to_string())]
        );
        apply(&mut state, b"00001 OK [CAPABILITY IMAP4rev1 IDLE] done\r\n");
        assert_eq!(state.capabilities(), &[Capability::Imap4Rev1, Capability::Idle]);
    }

    #[test]
    fn bye_is_recorded() {
        let mut state = ConnectionState::new();
        apply(&mut state, b"* BYE shutting down\r\n");
        assert_eq!(state.bye(), Some("shutting down"));
    }

    #[test]
    fn reselect_replaces_folder() {
        let mut state = selected_state();
        apply(&mut state, b"* 9 EXISTS\r\n");
        state.begin_select(SelectedFolder::new("Archive", true));
        let folder = state.selected().unwrap();
        assert_eq!(folder.name, Mailbox::new("Archive"));
        assert_eq!(folder.exists, 0);
        state.deselect();
        assert_eq!(state.phase(), Phase::Authenticated);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut state = selected_state();
        state.set_greeting("ready".to_string());
        apply(&mut state, b"* CAPABILITY IMAP4rev1\r\n");
        state.reset();
        assert!(state.capabilities().is_empty());
        assert!(state.greeting().is_none());
        assert!(state.identity().is_none());
        assert!(state.selected().is_none());
    }
}
