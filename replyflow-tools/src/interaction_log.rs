//! Append-only CSV table of handled emails.

use std::{
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Local;
use replyflow_core::SharedState;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::task;
use tracing::debug;

use crate::{
    core::{Tool, ToolCategory, ToolParameters},
    error::{Result, ToolError},
    keys::{DRAFTED_REPLY, FETCHED_EMAIL_DATA},
};

/// Default location of the interaction log.
pub const DEFAULT_LOG_FILE: &str = "email_log.csv";

/// Sender placeholder used when no message was fetched.
pub const UNKNOWN_SENDER: &str = "unknown";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the interaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogRecord {
    pub timestamp: String,
    pub sender: String,
    pub sender_name: String,
    pub original_email: String,
    pub reply_sent: String,
}

impl LogRecord {
    /// Build a record stamped with the current local time.
    pub fn now(
        sender: impl Into<String>,
        original_email: impl Into<String>,
        reply_sent: impl Into<String>,
    ) -> Self {
        let sender = sender.into();
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            sender_name: sender_name(&sender),
            sender,
            original_email: original_email.into(),
            reply_sent: reply_sent.into(),
        }
    }
}

/// Derive a display name from a sender string.
///
/// `"Jane Doe" <jane@example.com>` gives `Jane Doe`, `jane@example.com` gives
/// `jane`, anything else is returned as is. The `unknown` placeholder maps to
/// `Unknown`.
pub fn sender_name(sender: &str) -> String {
    if sender == UNKNOWN_SENDER {
        return "Unknown".to_string();
    }
    if let Some((display, _)) = sender.split_once('<') {
        return display.trim().trim_matches('"').to_string();
    }
    match sender.split_once('@') {
        Some((local, _)) => local.to_string(),
        None => sender.to_string(),
    }
}

/// The log file. Every append rewrites the whole table.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row; a missing file is an empty log.
    pub fn read_all(&self) -> Result<Vec<LogRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        reader
            .deserialize::<LogRecord>()
            .map(|row| row.map_err(ToolError::from))
            .collect()
    }

    /// Append one row and return the new row count.
    pub fn append_entry(&self, record: LogRecord) -> Result<usize> {
        let mut rows = self.read_all()?;
        rows.push(record);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), rows = rows.len(), "interaction log written");
        Ok(rows.len())
    }
}

/// Records the handled email and the reply in the interaction log.
pub struct LogInteractionTool {
    log: InteractionLog,
}

impl LogInteractionTool {
    pub fn new(log: InteractionLog) -> Self {
        Self { log }
    }

    fn record_from_state(state: &SharedState) -> LogRecord {
        LogRecord::now(
            state.string_or(&format!("{FETCHED_EMAIL_DATA}.sender"), UNKNOWN_SENDER),
            state.string_or(&format!("{FETCHED_EMAIL_DATA}.body"), ""),
            state.string_or(DRAFTED_REPLY, ""),
        )
    }
}

#[async_trait]
impl Tool for LogInteractionTool {
    fn name(&self) -> &str {
        "log_interaction"
    }

    fn description(&self) -> &str {
        "Record the fetched email and the reply that was sent in the interaction log"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::File
    }

    fn parameter_schema(&self) -> Value {
        ToolParameters::new_schema().into()
    }

    async fn invoke(&self, _parameters: ToolParameters, state: &SharedState) -> Result<Value> {
        let record = Self::record_from_state(state);
        let log = self.log.clone();

        let outcome = task::spawn_blocking(move || log.append_entry(record))
            .await
            .map_err(|e| ToolError::internal(format!("log task failed: {e}")))
            .and_then(|result| result);

        Ok(match outcome {
            Ok(_) => json!({
                "status": "success",
                "message": format!("Logged to {}", self.log.path().display()),
            }),
            Err(e) => json!({"status": "error", "message": format!("Failed to log: {e}")}),
        })
    }
}
