//! Error types for replyflow agent operations.

use replyflow_core::FlowError;
use thiserror::Error;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Main error type for agent operations.
///
/// Tool faults never show up here during a run: they are converted into
/// state values at the tool boundary. What remains are faults of the model
/// runtime, of configuration and of the state itself.
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Context error: {0}")]
    Context(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AgentError {
    /// Create a model error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Model(_) => "model",
            Self::Context(_) => "context",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<genai::Error> for AgentError {
    fn from(err: genai::Error) -> Self {
        Self::Model(err.to_string())
    }
}

// Integration with replyflow-core
impl From<FlowError> for AgentError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Construction(message) => Self::Configuration(message),
            other => Self::Context(other.to_string()),
        }
    }
}
