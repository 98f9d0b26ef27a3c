//! Replyflow Tools - the capabilities a replyflow pipeline can bind to its steps
//!
//! This crate provides:
//!
//! - The [`Tool`] trait with schema validation and guarded invocation: a tool
//!   fault never escapes, it is written into the shared state as
//!   `{"status": "error", "message": ...}`
//! - A [`ToolRegistry`] the workflow resolves its tools from by name
//! - The mail transport adapter (IMAP fetch of the latest unread message, SMTP send)
//! - The CSV interaction log
//! - A web page scraping tool (feature `http`)
//!
//! ## Example Usage
//!
//! ```rust
//! use replyflow_tools::prelude::*;
//!
//! struct EchoTool;
//!
//! #[async_trait]
//! impl Tool for EchoTool {
//!     fn name(&self) -> &str { "echo" }
//!     fn description(&self) -> &str { "Echo input back" }
//!     fn category(&self) -> ToolCategory { ToolCategory::Custom }
//!
//!     fn parameter_schema(&self) -> serde_json::Value {
//!         ToolParameters::new_schema()
//!             .add_required("message", "string", "Message to echo")
//!             .into()
//!     }
//!
//!     async fn invoke(&self, params: ToolParameters, _state: &SharedState) -> Result<Value> {
//!         let message: String = params.get("message")?;
//!         Ok(json!({"status": "success", "message": message}))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut state = SharedState::new();
//!     let params = ToolParameters::new(json!({"message": "Hello, World!"}));
//!
//!     let value = invoke_guarded(&EchoTool, params, &mut state).await;
//!     assert_eq!(value["status"], "success");
//!     assert_eq!(state.lookup_str("echo_result.message"), Some("Hello, World!"));
//! }
//! ```

/// Core tool abstractions and trait definitions.
pub mod core;
/// Error types for tool operations.
pub mod error;
/// CSV interaction log and the tool that appends to it.
pub mod interaction_log;
/// Well-known shared state keys.
pub mod keys;
/// IMAP/SMTP mail transport and the mail tools.
pub mod mail;
/// Tool registry for lookup and invocation.
pub mod registry;
/// Web page scraping tool.
#[cfg(feature = "http")]
pub mod web;

// Re-export commonly used types
pub use crate::core::{Tool, ToolCategory, ToolParameters, error_value, invoke_guarded};

pub use error::{ErrorCategory, Result, ToolError};
pub use interaction_log::{InteractionLog, LogInteractionTool, LogRecord, sender_name};
pub use mail::{FetchLatestUnreadTool, FetchResult, MailConfig, SendEmailTool, SendResult};
pub use registry::ToolRegistry;
#[cfg(feature = "http")]
pub use web::ScrapeWebPageTool;

/// Prelude module for convenient imports
pub mod prelude {
    pub use async_trait::async_trait;
    pub use replyflow_core::SharedState;
    pub use serde_json::{Value, json};

    #[cfg(feature = "http")]
    pub use crate::web::ScrapeWebPageTool;
    pub use crate::{
        core::{Tool, ToolCategory, ToolParameters, error_value, invoke_guarded},
        error::{ErrorCategory, Result, ToolError},
        interaction_log::{InteractionLog, LogInteractionTool, LogRecord},
        keys::{DRAFTED_REPLY, FETCHED_EMAIL_DATA},
        mail::{FetchLatestUnreadTool, FetchResult, MailConfig, SendEmailTool, SendResult},
        registry::ToolRegistry,
    };
}
