#![allow(clippy::expect_used, clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: log in, select INBOX and watch it with IDLE
//!
//! Authenticates with SASL PLAIN when the server advertises it and falls
//! back to LOGIN otherwise.
//!
//! ## Running
//!
//! ```bash
//! IMAP_HOST=imap.example.com IMAP_USER=me@example.com IMAP_PASSWORD=secret \
//!     RUST_LOG=mailwire_imap=debug \
//!     cargo run --package mailwire-imap --example idle_watch
//! ```

use std::time::Duration;

use mailwire_imap::sasl::Plain;
use mailwire_imap::{Client, Config, IdleEvent, Security};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let host = std::env::var("IMAP_HOST")?;
    let user = std::env::var("IMAP_USER")?;
    let password = std::env::var("IMAP_PASSWORD")?;

    let config = Config::builder(&host).security(Security::Implicit).build();
    println!("Connecting to {}:{}...", config.host, config.port);
    let mut client = Client::connect(&config).await?;
    if client.capabilities().is_empty() {
        client.capability().await?;
    }

    if client.supports_auth("PLAIN") {
        client.authenticate(&mut Plain::new(&user, &password)).await?;
    } else {
        client.login(&user, &password).await?;
    }
    println!("✓ Authenticated as {}", user);

    let inbox = client.select("INBOX").await?;
    println!("INBOX: {} messages, {} recent", inbox.exists, inbox.recent);

    if !client.supports_idle() {
        println!("Server does not support IDLE");
        client.logout().await?;
        return Ok(());
    }

    let mut handle = client.idle().await?;
    for _ in 0..10 {
        match handle.wait(Duration::from_secs(60)).await? {
            IdleEvent::Exists(n) => println!("  now {} messages", n),
            IdleEvent::Expunge(seq) => println!("  message {} expunged", seq),
            IdleEvent::Fetch { seq, flags } => println!("  message {} flags {}", seq, flags),
            IdleEvent::Terminated => break,
            IdleEvent::Timeout => println!("  no changes"),
            IdleEvent::Recent(_) | IdleEvent::Other(_) => {}
        }
    }
    handle.done().await?;

    client.logout().await?;
    println!("✓ Disconnected");
    Ok(())
}
