use std::sync::Arc;

use async_trait::async_trait;
use replyflow_core::SharedState;
use serde_json::Value;
use tokio::task;
use tracing::{debug, info};

use super::{
    config::MailConfig,
    model::{CREDENTIALS_MISSING_MESSAGE, FetchResult, SendResult},
    transport::{ImapConnector, MailConnector, Mailer, SmtpMailer, fetch_latest_unread},
};
use crate::{
    core::{Tool, ToolCategory, ToolParameters},
    error::{Result, ToolError},
    keys::{DRAFTED_REPLY, FETCHED_EMAIL_DATA},
};

/// Subject used when the caller does not supply one.
pub const DEFAULT_REPLY_SUBJECT: &str = "Re: Your Inquiry";

/// Fetches the latest unread message from the configured inbox.
///
/// Writes a [`FetchResult`] under `fetched_email_data`. Every failure mode is
/// reported as a value; the tool itself never returns `Err`.
pub struct FetchLatestUnreadTool {
    config: MailConfig,
    connector: Arc<dyn MailConnector>,
}

impl FetchLatestUnreadTool {
    pub fn new(config: MailConfig) -> Self {
        Self::with_connector(config, Arc::new(ImapConnector))
    }

    pub fn with_connector(config: MailConfig, connector: Arc<dyn MailConnector>) -> Self {
        Self { config, connector }
    }

    async fn fetch(&self) -> FetchResult {
        let Some(credentials) = self.config.credentials.clone() else {
            return FetchResult::error(CREDENTIALS_MISSING_MESSAGE);
        };
        let config = self.config.clone();
        let connector = Arc::clone(&self.connector);

        let outcome = task::spawn_blocking(move || {
            let mut session = connector.connect(&config, &credentials)?;
            fetch_latest_unread(session.as_mut())
        })
        .await
        .map_err(|e| ToolError::internal(format!("fetch task failed: {e}")))
        .and_then(|result| result);

        match outcome {
            Ok(result) => result,
            Err(e) => FetchResult::error(format!("Failed to fetch email: {e}")),
        }
    }
}

#[async_trait]
impl Tool for FetchLatestUnreadTool {
    fn name(&self) -> &str {
        "fetch_latest_unread_email_tool"
    }

    fn description(&self) -> &str {
        "Fetch the latest unread email from the inbox and mark it as read"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Communication
    }

    fn parameter_schema(&self) -> Value {
        ToolParameters::new_schema().into()
    }

    fn output_key(&self) -> String {
        FETCHED_EMAIL_DATA.to_string()
    }

    async fn invoke(&self, _parameters: ToolParameters, _state: &SharedState) -> Result<Value> {
        let result = self.fetch().await;
        debug!(status = result.status(), "fetch finished");
        Ok(serde_json::to_value(result)?)
    }
}

/// Sends one plain-text email from the configured account.
///
/// Every parameter is optional: the recipient falls back to the sender of the
/// fetched message, the subject to [`DEFAULT_REPLY_SUBJECT`] and the body to
/// the drafted reply.
pub struct SendEmailTool {
    config: MailConfig,
    mailer: Arc<dyn Mailer>,
}

impl SendEmailTool {
    pub fn new(config: MailConfig) -> Self {
        Self::with_mailer(config, Arc::new(SmtpMailer))
    }

    pub fn with_mailer(config: MailConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self { config, mailer }
    }

    async fn send(&self, recipient: String, subject: String, body: String) -> SendResult {
        let Some(credentials) = self.config.credentials.clone() else {
            return SendResult::error(CREDENTIALS_MISSING_MESSAGE);
        };
        if recipient.is_empty() {
            return SendResult::error("Failed to send email: no recipient address");
        }
        let config = self.config.clone();
        let mailer = Arc::clone(&self.mailer);
        let to = recipient.clone();

        let outcome = task::spawn_blocking(move || {
            mailer.send(&config, &credentials, &to, &subject, &body)
        })
        .await
        .map_err(|e| ToolError::internal(format!("send task failed: {e}")))
        .and_then(|result| result);

        match outcome {
            Ok(()) => {
                info!(recipient = %recipient, "email sent");
                SendResult::sent_to(&recipient)
            }
            Err(e) => SendResult::error(format!("Failed to send email: {e}")),
        }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an email reply. Defaults to replying to the fetched sender with the drafted reply"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Communication
    }

    fn parameter_schema(&self) -> Value {
        ToolParameters::new_schema()
            .add_optional(
                "recipient_email",
                "string",
                "Recipient address; defaults to the sender of the fetched email",
                None,
            )
            .add_optional(
                "subject",
                "string",
                "Subject line",
                Some(Value::from(DEFAULT_REPLY_SUBJECT)),
            )
            .add_optional(
                "body",
                "string",
                "Plain-text body; defaults to the drafted reply",
                None,
            )
            .into()
    }

    async fn invoke(&self, parameters: ToolParameters, state: &SharedState) -> Result<Value> {
        let recipient = match parameters.get_string_optional("recipient_email")? {
            Some(recipient) => recipient,
            None => state.string_or(&format!("{FETCHED_EMAIL_DATA}.sender"), ""),
        };
        let subject = parameters
            .get_string_optional("subject")?
            .unwrap_or_else(|| DEFAULT_REPLY_SUBJECT.to_string());
        let body = match parameters.get_string_optional("body")? {
            Some(body) => body,
            None => state.string_or(DRAFTED_REPLY, ""),
        };

        let result = self.send(recipient.trim().to_string(), subject, body).await;
        Ok(serde_json::to_value(result)?)
    }
}
