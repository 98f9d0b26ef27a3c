use serde::{Deserialize, Serialize};

/// Message reported when the inbox has nothing unread.
pub const NO_EMAIL_MESSAGE: &str = "No new unread emails.";

/// Message reported when credentials are missing from the environment.
pub const CREDENTIALS_MISSING_MESSAGE: &str = "Email credentials not configured.";

/// Outcome of fetching the latest unread message.
///
/// Serialized with a `status` tag so the gate can read
/// `fetched_email_data.status` straight from the shared state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchResult {
    Success { sender: String, body: String },
    NoEmail { message: String },
    Error { message: String },
}

impl FetchResult {
    pub fn no_email() -> Self {
        Self::NoEmail {
            message: NO_EMAIL_MESSAGE.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The `status` tag as it appears in the state.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::NoEmail { .. } => "no_email",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Outcome of sending one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendResult {
    Success { message: String },
    Error { message: String },
}

impl SendResult {
    pub fn sent_to(recipient: &str) -> Self {
        Self::Success {
            message: format!("Email sent to {recipient}"),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
