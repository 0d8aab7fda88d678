//! Decoders for extension data: ACL (RFC 4314), QUOTA (RFC 2087),
//! NAMESPACE (RFC 2342) and ENABLED (RFC 5161).

use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    Acl, AclEntry, ListRights, MyRights, NamespaceEntry, Namespaces, Quota, QuotaResource,
    QuotaResourceName, QuotaRoot, Rights,
};
use crate::Result;

/// `ACL mailbox *(SP identifier SP rights)`
pub fn parse_acl(lexer: &mut Lexer<'_>) -> Result<Acl> {
    let mailbox = lexer.read_astring()?;
    let mut entries = Vec::new();

    while lexer.eat(b' ') {
        let identifier = lexer.read_astring()?;
        lexer.expect_space()?;
        let rights = Rights::new(&lexer.read_astring()?);
        entries.push(AclEntry { identifier, rights });
    }

    Ok(Acl { mailbox, entries })
}

/// `LISTRIGHTS mailbox identifier required *(SP optional)`
pub fn parse_list_rights(lexer: &mut Lexer<'_>) -> Result<ListRights> {
    let mailbox = lexer.read_astring()?;
    lexer.expect_space()?;
    let identifier = lexer.read_astring()?;
    lexer.expect_space()?;
    let required = Rights::new(&lexer.read_astring()?);

    let mut optional = Vec::new();
    while lexer.eat(b' ') {
        optional.push(Rights::new(&lexer.read_astring()?));
    }

    Ok(ListRights {
        mailbox,
        identifier,
        required,
        optional,
    })
}

/// `MYRIGHTS mailbox rights`
pub fn parse_my_rights(lexer: &mut Lexer<'_>) -> Result<MyRights> {
    let mailbox = lexer.read_astring()?;
    lexer.expect_space()?;
    let rights = Rights::new(&lexer.read_astring()?);
    Ok(MyRights { mailbox, rights })
}

/// `QUOTA root (name usage limit ...)`
pub fn parse_quota(lexer: &mut Lexer<'_>) -> Result<Quota> {
    let root = lexer.read_astring()?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut resources = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                lexer.expect_space()?;
                let usage = lexer.read_number64()?;
                lexer.expect_space()?;
                let limit = lexer.read_number64()?;
                resources.push(QuotaResource {
                    name: QuotaResourceName::parse(name),
                    usage,
                    limit,
                });
            }
            token => return Err(lexer.error(&format!("unexpected token in QUOTA: {token:?}"))),
        }
    }

    Ok(Quota { root, resources })
}

/// `QUOTAROOT mailbox *(SP root)`
pub fn parse_quota_root(lexer: &mut Lexer<'_>) -> Result<QuotaRoot> {
    let mailbox = lexer.read_astring()?;
    let mut roots = Vec::new();
    while lexer.eat(b' ') {
        roots.push(lexer.read_astring()?);
    }
    Ok(QuotaRoot { mailbox, roots })
}

/// `NAMESPACE personal SP other SP shared`, each `NIL` or a list of
/// `(prefix delimiter *extension)`.
pub fn parse_namespace(lexer: &mut Lexer<'_>) -> Result<Namespaces> {
    let personal = parse_namespace_class(lexer)?;
    lexer.expect_space()?;
    let other_users = parse_namespace_class(lexer)?;
    lexer.expect_space()?;
    let shared = parse_namespace_class(lexer)?;

    Ok(Namespaces {
        personal,
        other_users,
        shared,
    })
}

fn parse_namespace_class(lexer: &mut Lexer<'_>) -> Result<Vec<NamespaceEntry>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut entries = Vec::new();
            while lexer.peek() == Some(b'(') {
                entries.push(parse_namespace_entry(lexer)?);
                lexer.skip_spaces();
            }
            lexer.expect(Token::RParen)?;
            Ok(entries)
        }
        token => Err(lexer.error(&format!("expected namespace list, got {token:?}"))),
    }
}

fn parse_namespace_entry(lexer: &mut Lexer<'_>) -> Result<NamespaceEntry> {
    lexer.expect(Token::LParen)?;
    let prefix = lexer.read_astring()?;
    lexer.expect_space()?;
    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => return Err(lexer.error(&format!("expected namespace delimiter, got {token:?}"))),
    };

    // Skip namespace response extensions.
    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => break,
            Token::RParen => depth -= 1,
            Token::Crlf | Token::Eof => return Err(lexer.error("unterminated namespace entry")),
            _ => {}
        }
    }

    Ok(NamespaceEntry { prefix, delimiter })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn acl_entries() {
        let mut lexer = Lexer::new(b"INBOX Fred rwipslxetad anyone lr");
        let acl = parse_acl(&mut lexer).unwrap();
        assert_eq!(acl.mailbox, "INBOX");
        assert_eq!(acl.entries.len(), 2);
        assert_eq!(acl.entries[0].identifier, "Fred");
        assert!(acl.entries[0].rights.has('x'));
        assert_eq!(acl.entries[1].rights.as_str(), "lr");
    }

    #[test]
    fn acl_without_entries() {
        let mut lexer = Lexer::new(b"Archive");
        let acl = parse_acl(&mut lexer).unwrap();
        assert!(acl.entries.is_empty());
    }

    #[test]
    fn list_rights_groups() {
        let mut lexer = Lexer::new(b"~/Mail/saved smith la r swicdkxte");
        let rights = parse_list_rights(&mut lexer).unwrap();
        assert_eq!(rights.identifier, "smith");
        assert_eq!(rights.required.as_str(), "al");
        assert_eq!(rights.optional.len(), 2);
    }

    #[test]
    fn my_rights() {
        let mut lexer = Lexer::new(b"INBOX rwiptsldaex");
        let rights = parse_my_rights(&mut lexer).unwrap();
        assert!(rights.rights.has('a'));
    }

    #[test]
    fn quota_resources() {
        let mut lexer = Lexer::new(b"\"\" (STORAGE 10 512 MESSAGE 5000000000 6000000000)");
        let quota = parse_quota(&mut lexer).unwrap();
        assert_eq!(quota.root, "");
        assert_eq!(quota.resources.len(), 2);
        assert_eq!(quota.resources[0].name, QuotaResourceName::Storage);
        assert_eq!(quota.resources[0].limit, 512);
        assert_eq!(quota.resources[1].usage, 5_000_000_000);
    }

    #[test]
    fn quota_root_list() {
        let mut lexer = Lexer::new(b"INBOX \"\" user.bob");
        let root = parse_quota_root(&mut lexer).unwrap();
        assert_eq!(root.mailbox, "INBOX");
        assert_eq!(root.roots, vec!["".to_string(), "user.bob".to_string()]);
    }

    #[test]
    fn namespace_classes() {
        let mut lexer =
            Lexer::new(b"((\"\" \"/\")) ((\"~\" \"/\")) ((\"#shared/\" \"/\" \"X-PARAM\" (\"a\" \"b\")))");
        let ns = parse_namespace(&mut lexer).unwrap();
        assert_eq!(ns.personal.len(), 1);
        assert_eq!(ns.personal[0].prefix, "");
        assert_eq!(ns.personal[0].delimiter, Some('/'));
        assert_eq!(ns.other_users[0].prefix, "~");
        assert_eq!(ns.shared[0].prefix, "#shared/");
    }

    #[test]
    fn namespace_nil_classes() {
        let mut lexer = Lexer::new(b"((\"INBOX.\" \".\")) NIL NIL");
        let ns = parse_namespace(&mut lexer).unwrap();
        assert_eq!(ns.personal[0].delimiter, Some('.'));
        assert!(ns.other_users.is_empty());
        assert!(ns.shared.is_empty());
    }
}
