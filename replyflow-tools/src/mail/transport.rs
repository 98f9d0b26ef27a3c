//! Blocking IMAP/SMTP transport behind small traits.
//!
//! Everything here blocks the calling thread; the tools run it on
//! `spawn_blocking`.

use std::net::TcpStream;

use lettre::{
    Message, SmtpTransport, Transport, message::Mailbox,
    transport::smtp::authentication::Credentials,
};
use native_tls::{TlsConnector, TlsStream};
use tracing::debug;

use super::{
    config::{MailConfig, MailCredentials},
    model::FetchResult,
    parse::parse_email,
};
use crate::error::{Result, ToolError};

/// Opens authenticated mailbox sessions with `INBOX` selected.
pub trait MailConnector: Send + Sync {
    fn connect(
        &self,
        config: &MailConfig,
        credentials: &MailCredentials,
    ) -> Result<Box<dyn MailSession>>;
}

/// The IMAP operations the fetch tool needs, addressed by sequence number.
pub trait MailSession {
    fn search_unseen(&mut self) -> Result<Vec<u32>>;
    fn fetch_rfc822(&mut self, seq: u32) -> Result<Vec<u8>>;
    fn mark_seen(&mut self, seq: u32) -> Result<()>;
    fn logout(&mut self) -> Result<()>;
}

/// Retrieve the latest unread message from an open session.
///
/// Takes the highest unseen sequence number, reads it, marks only that message
/// seen and logs out. With nothing unseen the session is logged out untouched
/// and `no_email` is returned.
pub fn fetch_latest_unread(session: &mut dyn MailSession) -> Result<FetchResult> {
    let unseen = session.search_unseen()?;
    let Some(latest) = unseen.into_iter().max() else {
        session.logout()?;
        return Ok(FetchResult::no_email());
    };

    debug!(seq = latest, "fetching latest unread message");
    let raw = session.fetch_rfc822(latest)?;
    let parsed = parse_email(&raw)?;

    session.mark_seen(latest)?;
    session.logout()?;

    Ok(FetchResult::Success {
        sender: parsed.sender,
        body: parsed.body,
    })
}

/// IMAP over implicit TLS using the `imap` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImapConnector;

impl MailConnector for ImapConnector {
    fn connect(
        &self,
        config: &MailConfig,
        credentials: &MailCredentials,
    ) -> Result<Box<dyn MailSession>> {
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| ToolError::transport(format!("tls setup failed: {e}")))?;
        let client = imap::connect(
            (config.imap_host.as_str(), config.imap_port),
            config.imap_host.as_str(),
            &tls,
        )?;
        let mut session = client
            .login(&credentials.address, credentials.password())
            .map_err(|(e, _client)| ToolError::authentication(e.to_string()))?;
        session.select("INBOX")?;
        Ok(Box::new(ImapSession { session }))
    }
}

struct ImapSession {
    session: imap::Session<TlsStream<TcpStream>>,
}

impl MailSession for ImapSession {
    fn search_unseen(&mut self) -> Result<Vec<u32>> {
        Ok(self.session.search("UNSEEN")?.into_iter().collect())
    }

    fn fetch_rfc822(&mut self, seq: u32) -> Result<Vec<u8>> {
        let fetches = self.session.fetch(seq.to_string(), "RFC822")?;
        fetches
            .iter()
            .find_map(|fetch| fetch.body())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ToolError::transport(format!("message {seq} returned no body")))
    }

    fn mark_seen(&mut self, seq: u32) -> Result<()> {
        self.session.store(seq.to_string(), "+FLAGS (\\Seen)")?;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.session.logout()?;
        Ok(())
    }
}

/// Sends one plain-text message.
pub trait Mailer: Send + Sync {
    fn send(
        &self,
        config: &MailConfig,
        credentials: &MailCredentials,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<()>;
}

/// SMTP over implicit TLS using `lettre`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpMailer;

impl Mailer for SmtpMailer {
    fn send(
        &self,
        config: &MailConfig,
        credentials: &MailCredentials,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<()> {
        let email = Message::builder()
            .from(credentials.address.parse::<Mailbox>().map_err(|e| {
                ToolError::invalid_field("from", format!("Invalid from address: {e}"))
            })?)
            .to(recipient.parse::<Mailbox>().map_err(|e| {
                ToolError::invalid_field("recipient_email", format!("Invalid to address: {e}"))
            })?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| ToolError::execution(format!("Failed to build email: {e}")))?;

        let transport = SmtpTransport::relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                credentials.address.clone(),
                credentials.password().to_string(),
            ))
            .build();

        transport.send(&email)?;
        Ok(())
    }
}
