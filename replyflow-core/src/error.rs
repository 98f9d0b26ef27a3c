//! Error types for replyflow-core.

use thiserror::Error;

/// Result type for state and pipeline-construction operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Error types that can occur while manipulating shared state or building a pipeline.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Shared state manipulation error.
    #[error("Context error: {0}")]
    Context(String),

    /// Pipeline construction error.
    #[error("Construction error: {0}")]
    Construction(String),

    /// Serialization/Deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error.
    #[error("Error: {0}")]
    Generic(#[from] eyre::Report),
}

impl FlowError {
    /// Create a new context error.
    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context(msg.into())
    }

    /// Create a new construction error.
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }
}
