//! Mail transport adapter: IMAP fetch of the latest unread message and SMTP
//! send, exposed as pipeline tools.

pub mod config;
pub mod model;
pub mod parse;
pub mod tools;
pub mod transport;

pub use config::{MailConfig, MailCredentials, SENDER_EMAIL_VAR, SENDER_PASSWORD_VAR};
pub use model::{CREDENTIALS_MISSING_MESSAGE, FetchResult, NO_EMAIL_MESSAGE, SendResult};
pub use parse::{ParsedEmail, parse_email};
pub use tools::{DEFAULT_REPLY_SUBJECT, FetchLatestUnreadTool, SendEmailTool};
pub use transport::{
    ImapConnector, MailConnector, MailSession, Mailer, SmtpMailer, fetch_latest_unread,
};
