//! Commands of the authenticated state (also legal while a folder is
//! selected).

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use super::Client;
use super::pipeline::{Access, Step};
use crate::command::{Command, Request, StatusAttribute};
use crate::connection::stream::Transport;
use crate::parser::{Completion, UntaggedResponse};
use crate::types::{
    AppendUid, Flag, ListResponse, Mailbox, MailboxStatus, ResponseCode, SelectedFolder,
};
use crate::{Error, Result};

/// Chunk size for streamed APPEND literals.
const APPEND_CHUNK_SIZE: usize = 64 * 1024;

/// APPENDUID of a completion, if the server sent one.
fn append_uid(completion: &Completion) -> Option<AppendUid> {
    match &completion.code {
        Some(ResponseCode::AppendUid(uid)) => Some(uid.clone()),
        _ => None,
    }
}

impl<S: Transport> Client<S> {
    /// Selects a mailbox for read-write access.
    ///
    /// Any previous selection is dropped first. On success the returned
    /// folder state is also available through [`selected`](Self::selected);
    /// on failure no folder is selected.
    pub async fn select(&mut self, mailbox: &str) -> Result<SelectedFolder> {
        let command = Command::Select {
            mailbox: Mailbox::new(mailbox),
        };
        self.open_folder(&command).await
    }

    /// Opens a mailbox read-only with EXAMINE.
    pub async fn examine(&mut self, mailbox: &str) -> Result<SelectedFolder> {
        let command = Command::Examine {
            mailbox: Mailbox::new(mailbox),
        };
        self.open_folder(&command).await
    }

    async fn open_folder(&mut self, command: &Command) -> Result<SelectedFolder> {
        self.run(command, &mut |_| {}).await?;
        self.state
            .selected()
            .cloned()
            .ok_or_else(|| Error::Protocol(format!("{} left no folder selected", command.verb())))
    }

    /// Creates a mailbox.
    pub async fn create(&mut self, mailbox: &str) -> Result<()> {
        let command = Command::Create {
            mailbox: Mailbox::new(mailbox),
        };
        self.run(&command, &mut |_| {}).await?;
        Ok(())
    }

    /// Deletes a mailbox.
    pub async fn delete(&mut self, mailbox: &str) -> Result<()> {
        let command = Command::Delete {
            mailbox: Mailbox::new(mailbox),
        };
        self.run(&command, &mut |_| {}).await?;
        Ok(())
    }

    /// Renames a mailbox.
    pub async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let command = Command::Rename {
            from: Mailbox::new(from),
            to: Mailbox::new(to),
        };
        self.run(&command, &mut |_| {}).await?;
        Ok(())
    }

    /// Subscribes to a mailbox.
    pub async fn subscribe(&mut self, mailbox: &str) -> Result<()> {
        let command = Command::Subscribe {
            mailbox: Mailbox::new(mailbox),
        };
        self.run(&command, &mut |_| {}).await?;
        Ok(())
    }

    /// Unsubscribes from a mailbox.
    pub async fn unsubscribe(&mut self, mailbox: &str) -> Result<()> {
        let command = Command::Unsubscribe {
            mailbox: Mailbox::new(mailbox),
        };
        self.run(&command, &mut |_| {}).await?;
        Ok(())
    }

    /// Lists mailboxes matching a pattern.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let command = Command::List {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        };
        let mut found = Vec::new();
        self.run(&command, &mut |u| {
            if let UntaggedResponse::List(item) = u {
                found.push(item.clone());
            }
        })
        .await?;
        Ok(found)
    }

    /// Lists subscribed mailboxes matching a pattern.
    pub async fn lsub(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let command = Command::Lsub {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        };
        let mut found = Vec::new();
        self.run(&command, &mut |u| {
            if let UntaggedResponse::LSub(item) = u {
                found.push(item.clone());
            }
        })
        .await?;
        Ok(found)
    }

    /// Gets the status of a mailbox without selecting it.
    ///
    /// Counters the server did not return stay `None`.
    pub async fn status(
        &mut self,
        mailbox: &str,
        items: &[StatusAttribute],
    ) -> Result<MailboxStatus> {
        let command = Command::Status {
            mailbox: Mailbox::new(mailbox),
            items: items.to_vec(),
        };
        let mut result = MailboxStatus::default();
        self.run(&command, &mut |u| {
            if let UntaggedResponse::Status { status, .. } = u {
                result = status.clone();
            }
        })
        .await?;
        Ok(result)
    }

    /// Appends a message held in memory.
    ///
    /// `date` is an IMAP date-time such as `17-Jul-1996 02:44:25 -0700`.
    /// Returns the APPENDUID the server reported, if any (UIDPLUS).
    pub async fn append(
        &mut self,
        mailbox: &str,
        flags: &[Flag],
        date: Option<&str>,
        message: &[u8],
    ) -> Result<Option<AppendUid>> {
        let command = Command::Append {
            mailbox: Mailbox::new(mailbox),
            flags: flags.to_vec(),
            date: date.map(str::to_string),
            message: message.to_vec(),
        };
        let completion = self.run(&command, &mut |_| {}).await?;
        Ok(append_uid(&completion))
    }

    /// Appends a message of declared length `len` read from `reader`.
    ///
    /// After the server's `+`, exactly `len` bytes are written. A reader
    /// that ends early is padded with spaces so the literal stays intact;
    /// extra bytes are left unread.
    pub async fn append_from_reader<R>(
        &mut self,
        mailbox: &str,
        flags: &[Flag],
        date: Option<&str>,
        reader: R,
        len: u64,
    ) -> Result<Option<AppendUid>>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.guard(Access::Authenticated)?;
        let request =
            Command::append_streamed(&self.tags.next(), &Mailbox::new(mailbox), flags, date, len);

        self.operation.begin(request.tag())?;
        let outcome = self.stream_append(&request, reader, len).await;
        let completion = self.settle(outcome)?;
        Ok(append_uid(&completion))
    }

    async fn stream_append<R>(&mut self, request: &Request, reader: R, len: u64) -> Result<Completion>
    where
        R: AsyncRead + Unpin + Send,
    {
        debug!(tag = %request.tag(), "C: {}", request.log_line());
        for part in request.parts() {
            self.send_part(part).await?;
        }

        match self.await_step(&mut |_| {}).await? {
            Step::Continue(_) => {}
            // Refused before the literal, e.g. NO [TRYCREATE].
            Step::Done(completion) => return self.complete(request.tag(), completion),
        }

        let mut body = reader.take(len);
        let mut buf = vec![0u8; APPEND_CHUNK_SIZE];
        let mut sent: u64 = 0;
        loop {
            let n = body.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            self.send_chunk(&buf[..n]).await?;
            sent += n as u64;
        }

        if sent < len {
            warn!(sent, len, "message reader ended early, padding literal");
            buf.fill(b' ');
            while sent < len {
                let n = usize::try_from(len - sent).map_or(buf.len(), |rest| rest.min(buf.len()));
                self.send_chunk(&buf[..n]).await?;
                sent += n as u64;
            }
        }
        self.send_part(b"\r\n").await?;

        match self.await_step(&mut |_| {}).await? {
            Step::Done(completion) => self.complete(request.tag(), completion),
            Step::Continue(_) => Err(Error::Protocol(
                "unexpected continuation request after APPEND literal".to_string(),
            )),
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
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::connection::state::Phase;
    use crate::types::{Flags, Uid, UidSet, UidValidity};

    async fn client(mock: Mock) -> Client<Mock> {
        Client::from_stream(mock).await.unwrap()
    }

    #[tokio::test]
    async fn select_builds_folder_state() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 SELECT INBOX\r\n")
            .read(b"* 172 EXISTS\r\n")
            .read(b"* 1 RECENT\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
            .read(b"* OK [UIDNEXT 4392] Predicted next UID\r\n")
            .read(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n")
            .read(b"00001 OK [READ-WRITE] SELECT completed\r\n")
            .build();
        let mut client = client(mock).await;

        let folder = client.select("INBOX").await.unwrap();
        assert_eq!(folder.name, Mailbox::inbox());
        assert_eq!(folder.exists, 172);
        assert_eq!(folder.recent, 1);
        assert_eq!(folder.uid_validity, UidValidity::new(3857529045));
        assert_eq!(folder.uid_next, Uid::new(4392));
        assert!(!folder.read_only);
        assert_eq!(client.selected(), Some(&folder));
        assert_eq!(client.phase(), Phase::Selected);
    }

    #[tokio::test]
    async fn select_tolerates_zero_unseen_and_uidnext() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 SELECT INBOX\r\n")
            .read(b"* 0 EXISTS\r\n")
            .read(b"* OK [UNSEEN 0] No unseen messages\r\n")
            .read(b"* OK [UIDNEXT 0] Predicted next UID\r\n")
            .read(b"00001 OK [READ-WRITE] SELECT completed\r\n")
            .write(b"00002 NOOP\r\n")
            .read(b"00002 OK NOOP completed\r\n")
            .build();
        let mut client = client(mock).await;

        let folder = client.select("INBOX").await.unwrap();
        assert_eq!(folder.first_unseen, None);
        assert_eq!(folder.uid_next, None);
        client.noop().await.unwrap();
    }

    #[tokio::test]
    async fn examine_is_read_only() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 EXAMINE Archive\r\n")
            .read(b"* 2 EXISTS\r\n")
            .read(b"00001 OK [READ-ONLY] EXAMINE completed\r\n")
            .build();
        let mut client = client(mock).await;
        let folder = client.examine("Archive").await.unwrap();
        assert!(folder.read_only);
        assert_eq!(folder.exists, 2);
    }

    #[tokio::test]
    async fn failed_select_clears_previous_folder() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 SELECT INBOX\r\n")
            .read(b"00001 OK [READ-WRITE] done\r\n")
            .write(b"00002 SELECT Missing\r\n")
            .read(b"00002 NO Mailbox doesn't exist\r\n")
            .build();
        let mut client = client(mock).await;
        client.select("INBOX").await.unwrap();

        let err = client.select("Missing").await.unwrap_err();
        assert!(matches!(err, Error::No { .. }));
        assert!(client.selected().is_none());
        assert_eq!(client.phase(), Phase::Authenticated);
    }

    #[tokio::test]
    async fn select_before_login_sends_nothing() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut client = client(mock).await;
        let err = client.select("INBOX").await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(client.commands_issued(), 0);
    }

    #[tokio::test]
    async fn list_collects_entries() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 LIST \"\" \"%\"\r\n")
            .read(b"* LIST (\\HasChildren) \"/\" INBOX\r\n")
            .read(b"* LIST (\\Noselect \\HasChildren) \"/\" Archive\r\n")
            .read(b"00001 OK LIST completed\r\n")
            .build();
        let mut client = client(mock).await;
        let entries = client.list("", "%").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].delimiter, Some('/'));
        assert!(entries[1].is_noselect());
    }

    #[tokio::test]
    async fn lsub_ignores_list_data() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 LSUB \"\" \"*\"\r\n")
            .read(b"* LSUB () \".\" INBOX.Sent\r\n")
            .read(b"00001 OK LSUB completed\r\n")
            .build();
        let mut client = client(mock).await;
        let entries = client.lsub("", "*").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mailbox.as_str(), "INBOX.Sent");
    }

    #[tokio::test]
    async fn status_counters() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 STATUS Sent (MESSAGES UNSEEN)\r\n")
            .read(b"* STATUS Sent (MESSAGES 231 UNSEEN 3)\r\n")
            .read(b"00001 OK STATUS completed\r\n")
            .build();
        let mut client = client(mock).await;
        let status = client
            .status("Sent", &[StatusAttribute::Messages, StatusAttribute::Unseen])
            .await
            .unwrap();
        assert_eq!(status.messages, Some(231));
        assert_eq!(status.unseen, Some(3));
        assert_eq!(status.recent, None);
    }

    #[tokio::test]
    async fn mailbox_management_round_trip() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 CREATE Projects\r\n")
            .read(b"00001 OK\r\n")
            .write(b"00002 RENAME Projects Work\r\n")
            .read(b"00002 OK\r\n")
            .write(b"00003 SUBSCRIBE Work\r\n")
            .read(b"00003 OK\r\n")
            .write(b"00004 UNSUBSCRIBE Work\r\n")
            .read(b"00004 OK\r\n")
            .write(b"00005 DELETE Work\r\n")
            .read(b"00005 OK\r\n")
            .build();
        let mut client = client(mock).await;
        client.create("Projects").await.unwrap();
        client.rename("Projects", "Work").await.unwrap();
        client.subscribe("Work").await.unwrap();
        client.unsubscribe("Work").await.unwrap();
        client.delete("Work").await.unwrap();
    }

    #[tokio::test]
    async fn append_returns_appenduid() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 APPEND Drafts (\\Seen) {5}\r\n")
            .read(b"+ Ready for literal data\r\n")
            .write(b"hello\r\n")
            .read(b"00001 OK [APPENDUID 38505 3955] APPEND completed\r\n")
            .build();
        let mut client = client(mock).await;
        let uid = client
            .append("Drafts", &[Flag::Seen], None, b"hello")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(uid.uid_validity, UidValidity::new(38505).unwrap());
        assert_eq!(uid.uids, UidSet::single(Uid::new(3955).unwrap()));
    }

    #[tokio::test]
    async fn append_refused_before_literal() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 APPEND Nowhere {5}\r\n")
            .read(b"00001 NO [TRYCREATE] No such mailbox\r\n")
            .build();
        let mut client = client(mock).await;
        let err = client.append("Nowhere", &[], None, b"hello").await.unwrap_err();
        assert!(matches!(err.code(), Some(ResponseCode::TryCreate)));
    }

    #[tokio::test]
    async fn append_from_reader_writes_declared_length() {
        let message = b"Subject: t\r\n\r\nbody";
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 APPEND INBOX {18}\r\n")
            .read(b"+ go\r\n")
            .write(message)
            .write(b"\r\n")
            .read(b"00001 OK done\r\n")
            .build();
        let mut client = client(mock).await;
        let reader: &[u8] = b"Subject: t\r\n\r\nbodyEXTRA";
        let uid = client
            .append_from_reader("INBOX", &[], None, reader, 18)
            .await
            .unwrap();
        assert!(uid.is_none());
    }

    #[tokio::test]
    async fn short_reader_is_padded() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 APPEND INBOX {6}\r\n")
            .read(b"+ go\r\n")
            .write(b"abc   \r\n")
            .read(b"00001 OK done\r\n")
            .build();
        let mut client = client(mock).await;
        let reader: &[u8] = b"abc";
        client
            .append_from_reader("INBOX", &[], None, reader, 6)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn selected_folder_flags_are_a_set() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 SELECT INBOX\r\n")
            .read(b"* FLAGS (\\Seen \\Deleted)\r\n")
            .read(b"00001 OK done\r\n")
            .build();
        let mut client = client(mock).await;
        let folder = client.select("INBOX").await.unwrap();
        assert!(folder
            .flags
            .same_set(&Flags::from_vec(vec![Flag::Deleted, Flag::Seen])));
    }
}
