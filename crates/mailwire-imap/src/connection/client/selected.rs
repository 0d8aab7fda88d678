//! Commands of the selected state.

use tracing::debug;

use super::Client;
use crate::command::{Command, FetchItems, SearchCriteria, StoreAction};
use crate::connection::stream::Transport;
use crate::parser::{Envelope, FetchItem, UntaggedResponse};
use crate::types::{CopyUid, Flag, Flags, Mailbox, ResponseCode, SeqNum, SequenceSet, Uid, UidSet};
use crate::{Error, Result};

/// Data returned for one message by FETCH or STORE.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMessage {
    /// Message sequence number.
    pub seq: SeqNum,
    /// Data items in the order the server sent them.
    pub items: Vec<FetchItem>,
}

impl FetchedMessage {
    /// UID, if it was fetched.
    #[must_use]
    pub fn uid(&self) -> Option<Uid> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Uid(uid) => Some(*uid),
            _ => None,
        })
    }

    /// Flags, if they were fetched.
    #[must_use]
    pub fn flags(&self) -> Option<&Flags> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Flags(flags) => Some(flags),
            _ => None,
        })
    }

    /// Envelope, if it was fetched.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Envelope(envelope) => Some(envelope.as_ref()),
            _ => None,
        })
    }

    /// Body data for `section` (`None` for the whole message).
    #[must_use]
    pub fn body(&self, section: Option<&str>) -> Option<&[u8]> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Body {
                section: s,
                data: Some(data),
                ..
            } if s.as_deref() == section => Some(data.as_slice()),
            _ => None,
        })
    }
}

/// COPYUID of a status response, if present.
fn copy_uid(code: Option<&ResponseCode>) -> Option<CopyUid> {
    match code {
        Some(ResponseCode::CopyUid(uid)) => Some(uid.clone()),
        _ => None,
    }
}

impl<S: Transport> Client<S> {
    /// Fetches data items for messages by sequence number.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
    ) -> Result<Vec<FetchedMessage>> {
        self.fetch_with(sequence.clone(), items, false).await
    }

    /// Fetches data items for messages by UID.
    pub async fn uid_fetch(&mut self, uids: &UidSet, items: FetchItems) -> Result<Vec<FetchedMessage>> {
        self.fetch_with(SequenceSet::from(uids), items, true).await
    }

    async fn fetch_with(
        &mut self,
        sequence: SequenceSet,
        items: FetchItems,
        uid: bool,
    ) -> Result<Vec<FetchedMessage>> {
        let command = Command::Fetch {
            sequence,
            items,
            uid,
        };
        self.collect_fetches(&command).await
    }

    async fn collect_fetches(&mut self, command: &Command) -> Result<Vec<FetchedMessage>> {
        let mut messages = Vec::new();
        self.run(command, &mut |u| {
            if let UntaggedResponse::Fetch { seq, items } = u {
                messages.push(FetchedMessage {
                    seq: *seq,
                    items: items.clone(),
                });
            }
        })
        .await?;
        Ok(messages)
    }

    /// Searches the selected folder, returning sequence numbers.
    ///
    /// String keys with 8-bit data are sent as literals; pass the charset
    /// they are encoded in, usually `UTF-8`.
    pub async fn search(
        &mut self,
        charset: Option<&str>,
        criteria: &SearchCriteria,
    ) -> Result<Vec<SeqNum>> {
        let hits = self.search_with(charset, criteria, false).await?;
        Ok(hits.into_iter().filter_map(SeqNum::new).collect())
    }

    /// Searches the selected folder, returning UIDs.
    pub async fn uid_search(
        &mut self,
        charset: Option<&str>,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Uid>> {
        let hits = self.search_with(charset, criteria, true).await?;
        Ok(hits.into_iter().filter_map(Uid::new).collect())
    }

    async fn search_with(
        &mut self,
        charset: Option<&str>,
        criteria: &SearchCriteria,
        uid: bool,
    ) -> Result<Vec<u32>> {
        let command = Command::Search {
            charset: charset.map(str::to_string),
            criteria: criteria.clone(),
            uid,
        };
        let mut hits = Vec::new();
        self.run(&command, &mut |u| {
            if let UntaggedResponse::Search(ids) = u {
                hits.extend_from_slice(ids);
            }
        })
        .await?;
        Ok(hits)
    }

    /// Changes flags of messages by sequence number.
    ///
    /// Unless `silent`, the server echoes the new flags as FETCH data,
    /// which is returned.
    pub async fn store(
        &mut self,
        sequence: &SequenceSet,
        action: StoreAction,
        silent: bool,
    ) -> Result<Vec<FetchedMessage>> {
        let command = Command::Store {
            sequence: sequence.clone(),
            action,
            uid: false,
            silent,
        };
        self.collect_fetches(&command).await
    }

    /// Changes flags of messages by UID.
    pub async fn uid_store(
        &mut self,
        uids: &UidSet,
        action: StoreAction,
        silent: bool,
    ) -> Result<Vec<FetchedMessage>> {
        let command = Command::Store {
            sequence: SequenceSet::from(uids),
            action,
            uid: true,
            silent,
        };
        self.collect_fetches(&command).await
    }

    /// Copies messages by sequence number. Returns COPYUID when the server
    /// reports it (UIDPLUS).
    pub async fn copy(&mut self, sequence: &SequenceSet, mailbox: &str) -> Result<Option<CopyUid>> {
        self.copy_with(sequence.clone(), Mailbox::new(mailbox), false)
            .await
    }

    /// Copies messages by UID.
    pub async fn uid_copy(&mut self, uids: &UidSet, mailbox: &str) -> Result<Option<CopyUid>> {
        self.copy_with(SequenceSet::from(uids), Mailbox::new(mailbox), true)
            .await
    }

    async fn copy_with(
        &mut self,
        sequence: SequenceSet,
        mailbox: Mailbox,
        uid: bool,
    ) -> Result<Option<CopyUid>> {
        let command = Command::Copy {
            sequence,
            mailbox,
            uid,
        };
        let completion = self.run(&command, &mut |_| {}).await?;
        Ok(copy_uid(completion.code.as_ref()))
    }

    /// Moves messages by sequence number.
    ///
    /// Uses MOVE when the server advertises it. Otherwise copies, marks the
    /// originals `\Deleted` and expunges; with UIDPLUS only the moved
    /// messages are expunged, without it every `\Deleted` message in the
    /// folder is.
    pub async fn move_messages(
        &mut self,
        sequence: &SequenceSet,
        mailbox: &str,
    ) -> Result<Option<CopyUid>> {
        self.move_with(sequence.clone(), Mailbox::new(mailbox), false)
            .await
    }

    /// Moves messages by UID.
    pub async fn uid_move(&mut self, uids: &UidSet, mailbox: &str) -> Result<Option<CopyUid>> {
        self.move_with(SequenceSet::from(uids), Mailbox::new(mailbox), true)
            .await
    }

    async fn move_with(
        &mut self,
        sequence: SequenceSet,
        mailbox: Mailbox,
        uid: bool,
    ) -> Result<Option<CopyUid>> {
        if self.supports_move() {
            let command = Command::Move {
                sequence,
                mailbox,
                uid,
            };
            // COPYUID arrives in an untagged OK before the EXPUNGEs.
            let mut reported = None;
            let completion = self
                .run(&command, &mut |u| {
                    if let UntaggedResponse::Condition { code, .. } = u
                        && let Some(found) = copy_uid(code.as_ref())
                    {
                        reported = Some(found);
                    }
                })
                .await?;
            return Ok(reported.or_else(|| copy_uid(completion.code.as_ref())));
        }

        debug!(%mailbox, "MOVE not advertised, composing COPY + STORE + EXPUNGE");
        let copied = self.copy_with(sequence.clone(), mailbox, uid).await?;

        let store = Command::Store {
            sequence: sequence.clone(),
            action: StoreAction::AddFlags(vec![Flag::Deleted]),
            uid,
            silent: true,
        };
        self.run(&store, &mut |_| {}).await?;

        let expunge = match (&copied, uid) {
            _ if !self.supports_uidplus() => Command::Expunge,
            (Some(copied), _) => Command::UidExpunge {
                uids: copied.source.clone(),
            },
            (None, true) => Command::UidExpunge {
                uids: UidSet::from(&sequence),
            },
            (None, false) => Command::Expunge,
        };
        self.run(&expunge, &mut |_| {}).await?;
        Ok(copied)
    }

    /// Permanently removes `\Deleted` messages. Returns the expunged
    /// sequence numbers in the order the server reported them.
    pub async fn expunge(&mut self) -> Result<Vec<SeqNum>> {
        self.collect_expunges(&Command::Expunge).await
    }

    /// Removes only the given `\Deleted` messages (UIDPLUS).
    pub async fn uid_expunge(&mut self, uids: &UidSet) -> Result<Vec<SeqNum>> {
        if !self.supports_uidplus() {
            return Err(Error::Precondition(
                "UID EXPUNGE needs the UIDPLUS capability".to_string(),
            ));
        }
        let command = Command::UidExpunge { uids: uids.clone() };
        self.collect_expunges(&command).await
    }

    async fn collect_expunges(&mut self, command: &Command) -> Result<Vec<SeqNum>> {
        let mut expunged = Vec::new();
        self.run(command, &mut |u| {
            if let UntaggedResponse::Expunge(seq) = u {
                expunged.push(*seq);
            }
        })
        .await?;
        Ok(expunged)
    }

    /// Requests a checkpoint of the selected folder.
    pub async fn check(&mut self) -> Result<()> {
        self.run(&Command::Check, &mut |_| {}).await?;
        Ok(())
    }

    /// Closes the folder, expunging `\Deleted` messages silently.
    pub async fn close(&mut self) -> Result<()> {
        self.run(&Command::Close, &mut |_| {}).await?;
        Ok(())
    }

    /// Closes the folder without expunging (RFC 3691).
    pub async fn unselect(&mut self) -> Result<()> {
        self.run(&Command::Unselect, &mut |_| {}).await?;
        Ok(())
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
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::command::FetchAttribute;
    use crate::connection::state::Phase;

    const SELECT: &[u8] = b"00001 SELECT INBOX\r\n";
    const SELECTED: &[u8] = b"00001 OK [READ-WRITE] SELECT completed\r\n";

    async fn selected(mock: Mock) -> Client<Mock> {
        let mut client = Client::from_stream(mock).await.unwrap();
        client.select("INBOX").await.unwrap();
        client
    }

    fn seq(n: u32) -> SeqNum {
        SeqNum::new(n).unwrap()
    }

    fn uid(n: u32) -> Uid {
        Uid::new(n).unwrap()
    }

    #[tokio::test]
    async fn fetch_collects_messages() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .write(b"00002 FETCH 1:2 (FLAGS UID)\r\n")
            .read(b"* 1 FETCH (FLAGS (\\Seen) UID 101)\r\n")
            .read(b"* 2 FETCH (FLAGS () UID 102)\r\n")
            .read(b"00002 OK FETCH completed\r\n")
            .build();
        let mut client = selected(mock).await;

        let items = FetchItems::Items(vec![FetchAttribute::Flags, FetchAttribute::Uid]);
        let messages = client
            .fetch(&SequenceSet::range(1, 2).unwrap(), items)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].seq, seq(1));
        assert_eq!(messages[0].uid(), Some(uid(101)));
        assert!(messages[0].flags().unwrap().is_seen());
        assert!(messages[1].flags().unwrap().is_empty());
    }

    #[tokio::test]
    async fn uid_fetch_body_literal() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .write(b"00002 UID FETCH 7 BODY.PEEK[TEXT]\r\n")
            .read(b"* 3 FETCH (UID 7 BODY[TEXT] {5}\r\nhello)\r\n")
            .read(b"00002 OK done\r\n")
            .build();
        let mut client = selected(mock).await;

        let items = FetchItems::Items(vec![FetchAttribute::Body {
            section: Some("TEXT".to_string()),
            peek: true,
            partial: None,
        }]);
        let messages = client
            .uid_fetch(&UidSet::single(uid(7)), items)
            .await
            .unwrap();
        assert_eq!(messages[0].body(Some("TEXT")), Some(&b"hello"[..]));
        assert_eq!(messages[0].body(None), None);
    }

    #[tokio::test]
    async fn fetch_outside_selection_sends_nothing() {
        let mock = Builder::new().read(b"* PREAUTH ready\r\n").build();
        let mut client = Client::from_stream(mock).await.unwrap();
        let err = client.fetch(&SequenceSet::All, FetchItems::Fast).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(client.commands_issued(), 0);
    }

    #[tokio::test]
    async fn search_with_charset_literal() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .write(b"00002 SEARCH CHARSET UTF-8 SUBJECT {5}\r\n")
            .read(b"+ Ready\r\n")
            .write("\u{fc}ber\r\n".as_bytes())
            .read(b"* SEARCH 2 84 882\r\n")
            .read(b"00002 OK SEARCH completed\r\n")
            .build();
        let mut client = selected(mock).await;
        let hits = client
            .search(
                Some("UTF-8"),
                &SearchCriteria::Subject("\u{fc}ber".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(hits, vec![seq(2), seq(84), seq(882)]);
    }

    #[tokio::test]
    async fn uid_search_returns_uids() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .write(b"00002 UID SEARCH UNSEEN\r\n")
            .read(b"* SEARCH 4000 4002\r\n")
            .read(b"00002 OK\r\n")
            .build();
        let mut client = selected(mock).await;
        let hits = client.uid_search(None, &SearchCriteria::Unseen).await.unwrap();
        assert_eq!(hits, vec![uid(4000), uid(4002)]);
    }

    #[tokio::test]
    async fn store_returns_echoed_flags() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .write(b"00002 STORE 2 +FLAGS (\\Flagged)\r\n")
            .read(b"* 2 FETCH (FLAGS (\\Seen \\Flagged))\r\n")
            .read(b"00002 OK STORE completed\r\n")
            .build();
        let mut client = selected(mock).await;
        let echoed = client
            .store(
                &SequenceSet::single(2).unwrap(),
                StoreAction::AddFlags(vec![Flag::Flagged]),
                false,
            )
            .await
            .unwrap();
        assert!(echoed[0].flags().unwrap().contains(&Flag::Flagged));
    }

    #[tokio::test]
    async fn copy_reports_copyuid() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .write(b"00002 UID COPY 4:5 Archive\r\n")
            .read(b"00002 OK [COPYUID 38505 4:5 101:102] Done\r\n")
            .build();
        let mut client = selected(mock).await;
        let copied = client
            .uid_copy(&UidSet::range(uid(4), uid(5)), "Archive")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(copied.pairs(), vec![(uid(4), uid(101)), (uid(5), uid(102))]);
    }

    #[tokio::test]
    async fn native_move_reads_untagged_copyuid() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 MOVE UIDPLUS] ready\r\n")
            .write(b"00001 LOGIN bob pw\r\n")
            .read(b"00001 OK\r\n")
            .write(b"00002 SELECT INBOX\r\n")
            .read(b"00002 OK [READ-WRITE] done\r\n")
            .write(b"00003 UID MOVE 42 Trash\r\n")
            .read(b"* OK [COPYUID 432432 42 2] Moved UIDs.\r\n")
            .read(b"* 3 EXPUNGE\r\n")
            .read(b"00003 OK Move completed\r\n")
            .build();
        let mut client = Client::from_stream(mock).await.unwrap();
        client.login("bob", "pw").await.unwrap();
        client.select("INBOX").await.unwrap();

        let moved = client
            .uid_move(&UidSet::single(uid(42)), "Trash")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.destination, UidSet::single(uid(2)));
    }

    #[tokio::test]
    async fn move_fallback_with_uidplus_expunges_only_moved() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 UIDPLUS] ready\r\n")
            .write(b"00001 LOGIN bob pw\r\n")
            .read(b"00001 OK\r\n")
            .write(b"00002 SELECT INBOX\r\n")
            .read(b"00002 OK done\r\n")
            .write(b"00003 COPY 1:2 Trash\r\n")
            .read(b"00003 OK [COPYUID 9 31:32 7:8] done\r\n")
            .write(b"00004 STORE 1:2 +FLAGS.SILENT (\\Deleted)\r\n")
            .read(b"00004 OK\r\n")
            .write(b"00005 UID EXPUNGE 31:32\r\n")
            .read(b"* 1 EXPUNGE\r\n")
            .read(b"* 1 EXPUNGE\r\n")
            .read(b"00005 OK\r\n")
            .build();
        let mut client = Client::from_stream(mock).await.unwrap();
        client.login("bob", "pw").await.unwrap();
        client.select("INBOX").await.unwrap();

        let moved = client
            .move_messages(&SequenceSet::range(1, 2).unwrap(), "Trash")
            .await
            .unwrap();
        assert!(moved.is_some());
    }

    #[tokio::test]
    async fn move_fallback_without_uidplus_uses_expunge() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .write(b"00002 UID COPY 10 Trash\r\n")
            .read(b"00002 OK\r\n")
            .write(b"00003 UID STORE 10 +FLAGS.SILENT (\\Deleted)\r\n")
            .read(b"00003 OK\r\n")
            .write(b"00004 EXPUNGE\r\n")
            .read(b"* 4 EXPUNGE\r\n")
            .read(b"00004 OK\r\n")
            .build();
        let mut client = selected(mock).await;
        let moved = client
            .uid_move(&UidSet::single(uid(10)), "Trash")
            .await
            .unwrap();
        assert!(moved.is_none());
    }

    #[tokio::test]
    async fn expunge_reports_sequence_numbers() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .write(b"00002 EXPUNGE\r\n")
            .read(b"* 3 EXPUNGE\r\n")
            .read(b"* 3 EXPUNGE\r\n")
            .read(b"* 5 EXPUNGE\r\n")
            .read(b"00002 OK EXPUNGE completed\r\n")
            .build();
        let mut client = selected(mock).await;
        let gone = client.expunge().await.unwrap();
        assert_eq!(gone, vec![seq(3), seq(3), seq(5)]);
    }

    #[tokio::test]
    async fn uid_expunge_needs_uidplus() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .build();
        let mut client = selected(mock).await;
        let err = client
            .uid_expunge(&UidSet::single(uid(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn close_and_unselect_drop_selection() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(SELECT)
            .read(SELECTED)
            .write(b"00002 CHECK\r\n")
            .read(b"00002 OK\r\n")
            .write(b"00003 CLOSE\r\n")
            .read(b"00003 OK\r\n")
            .write(b"00004 SELECT INBOX\r\n")
            .read(b"00004 OK\r\n")
            .write(b"00005 UNSELECT\r\n")
            .read(b"00005 OK\r\n")
            .build();
        let mut client = selected(mock).await;
        client.check().await.unwrap();
        client.close().await.unwrap();
        assert_eq!(client.phase(), Phase::Authenticated);
        client.select("INBOX").await.unwrap();
        client.unselect().await.unwrap();
        assert!(client.selected().is_none());

        let err = client.close().await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }
}
