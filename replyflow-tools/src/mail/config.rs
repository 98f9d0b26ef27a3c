use secrecy::{ExposeSecret, SecretString};

/// Environment variable holding the mailbox address.
pub const SENDER_EMAIL_VAR: &str = "SENDER_EMAIL";
/// Environment variable holding the mailbox password (app password).
pub const SENDER_PASSWORD_VAR: &str = "SENDER_PASSWORD";

/// Account used both to read the inbox and to send replies.
#[derive(Clone)]
pub struct MailCredentials {
    pub address: String,
    pub password: SecretString,
}

impl MailCredentials {
    pub fn new(address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl std::fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailCredentials")
            .field("address", &self.address)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Mail server endpoints and the optional account.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// `None` when either credential variable is missing or empty.
    pub credentials: Option<MailCredentials>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            imap_host: "imap.gmail.com".to_string(),
            imap_port: 993,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            credentials: None,
        }
    }
}

impl MailConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// Reads `SENDER_EMAIL`/`SENDER_PASSWORD` and the optional
    /// `REPLYFLOW_{IMAP,SMTP}_{HOST,PORT}` overrides. Unparseable ports fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let port = |key: &str, default: u16| {
            non_empty(key)
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(default)
        };

        let credentials = match (non_empty(SENDER_EMAIL_VAR), non_empty(SENDER_PASSWORD_VAR)) {
            (Some(address), Some(password)) => Some(MailCredentials::new(address, password)),
            _ => None,
        };

        Self {
            imap_host: non_empty("REPLYFLOW_IMAP_HOST").unwrap_or(defaults.imap_host),
            imap_port: port("REPLYFLOW_IMAP_PORT", defaults.imap_port),
            smtp_host: non_empty("REPLYFLOW_SMTP_HOST").unwrap_or(defaults.smtp_host),
            smtp_port: port("REPLYFLOW_SMTP_PORT", defaults.smtp_port),
            credentials,
        }
    }

    pub fn with_credentials(mut self, credentials: MailCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_imap(mut self, host: impl Into<String>, port: u16) -> Self {
        self.imap_host = host.into();
        self.imap_port = port;
        self
    }

    pub fn with_smtp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.smtp_host = host.into();
        self.smtp_port = port;
        self
    }
}
