use std::fmt;

use replyflow_core::FlowError;
use thiserror::Error;

/// Result type for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;

/// Main error type for tool operations
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an invalid parameters error
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    /// Create an invalid field error
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a transport error (connection or protocol fault)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error category for classification
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::InvalidParameters(_) | Self::InvalidField { .. } => ErrorCategory::InvalidInput,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::Persistence(_) => ErrorCategory::Persistence,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Execution(_) => ErrorCategory::Execution,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification and handling
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    InvalidInput,
    Transport,
    Authentication,
    Persistence,
    Network,
    Timeout,
    Validation,
    Serialization,
    Execution,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::InvalidInput => write!(f, "invalid_input"),
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::Authentication => write!(f, "authentication"),
            ErrorCategory::Persistence => write!(f, "persistence"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Serialization => write!(f, "serialization"),
            ErrorCategory::Execution => write!(f, "execution"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<csv::Error> for ToolError {
    fn from(err: csv::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<imap::Error> for ToolError {
    fn from(err: imap::Error) -> Self {
        match err {
            imap::Error::No(_) | imap::Error::Bad(_) => Self::Authentication(err.to_string()),
            _ => Self::Transport(err.to_string()),
        }
    }
}

impl From<lettre::transport::smtp::Error> for ToolError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_status() {
            let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
            match status {
                401 | 403 => Self::Authentication(err.to_string()),
                404 => Self::NotFound(err.to_string()),
                _ => Self::Network(err.to_string()),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

// Integration with replyflow-core errors
impl From<FlowError> for ToolError {
    fn from(err: FlowError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ToolError::not_found("send_email");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.to_string(), "Tool not found: send_email");
    }

    #[test]
    fn test_imap_rejections_are_authentication_faults() {
        let rejected = ToolError::from(imap::Error::No("[AUTHENTICATIONFAILED]".to_string()));
        assert_eq!(rejected.category(), ErrorCategory::Authentication);

        let transport = ToolError::transport("connection reset");
        assert_eq!(transport.category().to_string(), "transport");
    }

    #[test]
    fn test_io_maps_to_persistence() {
        let err = ToolError::from(std::io::Error::other("disk full"));
        assert_eq!(err.category(), ErrorCategory::Persistence);
        assert_eq!(err.category().to_string(), "persistence");
    }
}
