//! Extension commands: ACL (RFC 4314), QUOTA (RFC 2087), NAMESPACE
//! (RFC 2342) and ENABLE (RFC 5161).
//!
//! All are legal in the authenticated and selected states.

use super::Client;
use crate::command::Command;
use crate::connection::stream::Transport;
use crate::parser::UntaggedResponse;
use crate::types::{
    Acl, AclModifyMode, Capability, ListRights, Mailbox, MyRights, Namespaces, Quota,
    QuotaResourceName, QuotaRootInfo, Rights,
};
use crate::{Error, Result};

fn missing(what: &str) -> Error {
    Error::Protocol(format!("server completed without {what} data"))
}

impl<S: Transport> Client<S> {
    /// Returns the access control list of a mailbox.
    pub async fn get_acl(&mut self, mailbox: &str) -> Result<Acl> {
        let command = Command::GetAcl {
            mailbox: Mailbox::new(mailbox),
        };
        let mut acl = None;
        self.run(&command, &mut |u| {
            if let UntaggedResponse::Acl(found) = u {
                acl = Some(found.clone());
            }
        })
        .await?;
        acl.ok_or_else(|| missing("ACL"))
    }

    /// Replaces, adds to or removes from an identifier's rights.
    pub async fn set_acl(
        &mut self,
        mailbox: &str,
        identifier: &str,
        mode: AclModifyMode,
        rights: &Rights,
    ) -> Result<()> {
        let command = Command::SetAcl {
            mailbox: Mailbox::new(mailbox),
            identifier: identifier.to_string(),
            mode,
            rights: rights.clone(),
        };
        self.run(&command, &mut |_| {}).await?;
        Ok(())
    }

    /// Removes an identifier from a mailbox's ACL.
    pub async fn delete_acl(&mut self, mailbox: &str, identifier: &str) -> Result<()> {
        let command = Command::DeleteAcl {
            mailbox: Mailbox::new(mailbox),
            identifier: identifier.to_string(),
        };
        self.run(&command, &mut |_| {}).await?;
        Ok(())
    }

    /// Returns the rights that may be granted to an identifier.
    pub async fn list_rights(&mut self, mailbox: &str, identifier: &str) -> Result<ListRights> {
        let command = Command::ListRights {
            mailbox: Mailbox::new(mailbox),
            identifier: identifier.to_string(),
        };
        let mut rights = None;
        self.run(&command, &mut |u| {
            if let UntaggedResponse::ListRights(found) = u {
                rights = Some(found.clone());
            }
        })
        .await?;
        rights.ok_or_else(|| missing("LISTRIGHTS"))
    }

    /// Returns the current user's rights on a mailbox.
    pub async fn my_rights(&mut self, mailbox: &str) -> Result<MyRights> {
        let command = Command::MyRights {
            mailbox: Mailbox::new(mailbox),
        };
        let mut rights = None;
        self.run(&command, &mut |u| {
            if let UntaggedResponse::MyRights(found) = u {
                rights = Some(found.clone());
            }
        })
        .await?;
        rights.ok_or_else(|| missing("MYRIGHTS"))
    }

    /// Returns usage and limits of a quota root.
    pub async fn get_quota(&mut self, root: &str) -> Result<Quota> {
        let command = Command::GetQuota {
            root: root.to_string(),
        };
        let mut quota = None;
        self.run(&command, &mut |u| {
            if let UntaggedResponse::Quota(found) = u {
                quota = Some(found.clone());
            }
        })
        .await?;
        quota.ok_or_else(|| missing("QUOTA"))
    }

    /// Returns the quota roots of a mailbox and the quotas of each.
    pub async fn get_quota_root(&mut self, mailbox: &str) -> Result<QuotaRootInfo> {
        let command = Command::GetQuotaRoot {
            mailbox: Mailbox::new(mailbox),
        };
        let mut info = QuotaRootInfo::default();
        self.run(&command, &mut |u| match u {
            UntaggedResponse::QuotaRoot(root) => info.roots.push(root.clone()),
            UntaggedResponse::Quota(quota) => info.quotas.push(quota.clone()),
            _ => {}
        })
        .await?;
        Ok(info)
    }

    /// Sets resource limits on a quota root. An empty list removes all
    /// limits. Returns the resulting quota when the server reports it.
    pub async fn set_quota(
        &mut self,
        root: &str,
        limits: &[(QuotaResourceName, u64)],
    ) -> Result<Option<Quota>> {
        let command = Command::SetQuota {
            root: root.to_string(),
            limits: limits.to_vec(),
        };
        let mut quota = None;
        self.run(&command, &mut |u| {
            if let UntaggedResponse::Quota(found) = u {
                quota = Some(found.clone());
            }
        })
        .await?;
        Ok(quota)
    }

    /// Returns the server's personal, other-users and shared namespaces.
    pub async fn namespace(&mut self) -> Result<Namespaces> {
        let mut namespaces = None;
        self.run(&Command::Namespace, &mut |u| {
            if let UntaggedResponse::Namespace(found) = u {
                namespaces = Some(found.clone());
            }
        })
        .await?;
        namespaces.ok_or_else(|| missing("NAMESPACE"))
    }

    /// Enables server extensions. Returns the ones the server reports as
    /// enabled, which may be fewer than requested.
    pub async fn enable(&mut self, capabilities: &[&str]) -> Result<Vec<Capability>> {
        let command = Command::Enable {
            capabilities: capabilities.iter().map(|c| (*c).to_string()).collect(),
        };
        let mut enabled = Vec::new();
        self.run(&command, &mut |u| {
            if let UntaggedResponse::Enabled(caps) = u {
                enabled.extend(caps.iter().cloned());
            }
        })
        .await?;
        Ok(enabled)
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
    use crate::ErrorKind;

    async fn client(mock: Mock) -> Client<Mock> {
        Client::from_stream(mock).await.unwrap()
    }

    #[tokio::test]
    async fn acl_round_trip() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 GETACL INBOX\r\n")
            .read(b"* ACL INBOX bob lrswipkxtea fred lr\r\n")
            .read(b"00001 OK Getacl complete\r\n")
            .write(b"00002 SETACL INBOX fred +w\r\n")
            .read(b"00002 OK Setacl complete\r\n")
            .write(b"00003 DELETEACL INBOX fred\r\n")
            .read(b"00003 OK Deleteacl complete\r\n")
            .build();
        let mut client = client(mock).await;

        let acl = client.get_acl("INBOX").await.unwrap();
        assert_eq!(acl.entries.len(), 2);
        assert!(acl.entries[0].rights.has('a'));
        assert!(!acl.entries[1].rights.has('w'));

        client
            .set_acl("INBOX", "fred", AclModifyMode::Add, &Rights::new("w"))
            .await
            .unwrap();
        client.delete_acl("INBOX", "fred").await.unwrap();
    }

    #[tokio::test]
    async fn rights_queries() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 LISTRIGHTS INBOX smith\r\n")
            .read(b"* LISTRIGHTS INBOX smith la r swicdkxte\r\n")
            .read(b"00001 OK Listrights completed\r\n")
            .write(b"00002 MYRIGHTS INBOX\r\n")
            .read(b"* MYRIGHTS INBOX rwiptsldaex\r\n")
            .read(b"00002 OK Myrights complete\r\n")
            .build();
        let mut client = client(mock).await;

        let listed = client.list_rights("INBOX", "smith").await.unwrap();
        assert!(listed.required.has('l'));
        assert_eq!(listed.optional.len(), 2);

        let mine = client.my_rights("INBOX").await.unwrap();
        assert!(mine.rights.has('x'));
    }

    #[tokio::test]
    async fn missing_data_is_protocol_error() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 MYRIGHTS INBOX\r\n")
            .read(b"00001 OK\r\n")
            .build();
        let mut client = client(mock).await;
        let err = client.my_rights("INBOX").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolError);
    }

    #[tokio::test]
    async fn quota_commands() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 GETQUOTAROOT INBOX\r\n")
            .read(b"* QUOTAROOT INBOX \"\"\r\n")
            .read(b"* QUOTA \"\" (STORAGE 10 512)\r\n")
            .read(b"00001 OK Getquotaroot completed\r\n")
            .write(b"00002 GETQUOTA \"\"\r\n")
            .read(b"* QUOTA \"\" (STORAGE 10 512)\r\n")
            .read(b"00002 OK Getquota completed\r\n")
            .write(b"00003 SETQUOTA \"\" (STORAGE 1024)\r\n")
            .read(b"* QUOTA \"\" (STORAGE 10 1024)\r\n")
            .read(b"00003 OK Setquota completed\r\n")
            .build();
        let mut client = client(mock).await;

        let info = client.get_quota_root("INBOX").await.unwrap();
        assert_eq!(info.roots.len(), 1);
        assert_eq!(info.roots[0].roots, vec![String::new()]);
        assert_eq!(info.quotas[0].resources[0].limit, 512);

        let quota = client.get_quota("").await.unwrap();
        assert_eq!(quota.resources[0].name, QuotaResourceName::Storage);
        assert_eq!(quota.resources[0].usage, 10);

        let updated = client
            .set_quota("", &[(QuotaResourceName::Storage, 1024)])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.resources[0].limit, 1024);
    }

    #[tokio::test]
    async fn namespace_and_enable() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 NAMESPACE\r\n")
            .read(b"* NAMESPACE ((\"\" \"/\")) NIL ((\"Public Folders/\" \"/\"))\r\n")
            .read(b"00001 OK NAMESPACE command completed\r\n")
            .write(b"00002 ENABLE CONDSTORE X-UNKNOWN\r\n")
            .read(b"* ENABLED CONDSTORE\r\n")
            .read(b"00002 OK Enabled\r\n")
            .build();
        let mut client = client(mock).await;

        let namespaces = client.namespace().await.unwrap();
        assert_eq!(namespaces.personal[0].delimiter, Some('/'));
        assert!(namespaces.other_users.is_empty());
        assert_eq!(namespaces.shared[0].prefix, "Public Folders/");

        let enabled = client.enable(&["CONDSTORE", "X-UNKNOWN"]).await.unwrap();
        assert_eq!(enabled, vec![Capability::CondStore]);
    }

    #[tokio::test]
    async fn enable_is_refused_with_a_folder_selected() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"00001 SELECT INBOX\r\n")
            .read(b"* 2 EXISTS\r\n")
            .read(b"00001 OK [READ-WRITE] SELECT completed\r\n")
            .build();
        let mut client = client(mock).await;
        client.select("INBOX").await.unwrap();

        let err = client.enable(&["CONDSTORE"]).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(client.selected().is_some());
    }

    #[tokio::test]
    async fn extensions_need_authentication() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut client = client(mock).await;
        assert!(matches!(
            client.namespace().await.unwrap_err(),
            Error::Precondition(_)
        ));
        assert!(matches!(
            client.get_quota("").await.unwrap_err(),
            Error::Precondition(_)
        ));
    }
}
