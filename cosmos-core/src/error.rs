//! Error types for Cosmos

use thiserror::Error;

/// Result type alias for Cosmos operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Cosmos operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or invalid user input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Generative model call failed
    #[error("Model error: {message}")]
    Model {
        message: String,
        /// Whether the same request may succeed if retried later
        retryable: bool,
    },

    /// No stream fragment arrived within the idle timeout
    #[error("Timed out after {0:?} without a response")]
    Timeout(std::time::Duration),

    /// The operation was cancelled by its caller
    #[error("Operation cancelled")]
    Cancelled,

    /// A request is already in flight for this mission
    #[error("Mission {0} already has a request in flight")]
    Busy(String),

    /// Entity lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency retries exhausted
    #[error("Conflicting update on {0}")]
    Conflict(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a model error
    pub fn model(message: impl Into<String>, retryable: bool) -> Self {
        Error::Model {
            message: message.into(),
            retryable,
        }
    }

    /// Whether retrying the failed operation could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Model { retryable, .. } => *retryable,
            Error::Timeout(_) | Error::Conflict(_) | Error::Busy(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::model("rate limited", true).is_retryable());
        assert!(!Error::model("bad request", false).is_retryable());
        assert!(Error::Timeout(std::time::Duration::from_secs(1)).is_retryable());
        assert!(!Error::Validation("empty".to_string()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::Busy("m-1".to_string()).to_string(),
            "Mission m-1 already has a request in flight"
        );
        assert_eq!(Error::model("boom", false).to_string(), "Model error: boom");
    }
}
