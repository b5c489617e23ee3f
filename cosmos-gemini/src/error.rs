//! Gemini client errors

use std::time::Duration;

use thiserror::Error;

/// Result type for Gemini operations
pub type Result<T> = std::result::Result<T, GeminiError>;

/// Gemini client errors
#[derive(Error, Debug)]
pub enum GeminiError {
    /// API key not configured
    #[error("Gemini API key not configured; set GEMINI_API_KEY or run `cosmos secrets init`")]
    MissingApiKey,

    /// Base URL is not a valid http(s) URL
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Transport failure before a response arrived
    #[error("Request failed: {message}")]
    Transport { message: String, retryable: bool },

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        retryable: bool,
        retry_after: Option<Duration>,
    },

    /// The API reported an error inside a successful response
    #[error("API error: {0}")]
    Api(String),

    /// Response body could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Response held no usable content
    #[error("{0}")]
    Empty(String),
}

impl GeminiError {
    /// Whether retrying the request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GeminiError::Transport { retryable, .. } | GeminiError::Http { retryable, .. } => {
                *retryable
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GeminiError {
    fn from(err: reqwest::Error) -> Self {
        GeminiError::Transport {
            retryable: err.is_connect() || err.is_timeout(),
            message: err.to_string(),
        }
    }
}

impl From<GeminiError> for cosmos_core::Error {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::MissingApiKey | GeminiError::InvalidBaseUrl(_) => {
                cosmos_core::Error::Config(err.to_string())
            }
            other => {
                let retryable = other.is_retryable();
                cosmos_core::Error::model(other.to_string(), retryable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_retryability() {
        let err: cosmos_core::Error = GeminiError::Http {
            status: 429,
            message: "RESOURCE_EXHAUSTED: quota".to_string(),
            retryable: true,
            retry_after: None,
        }
        .into();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Model error: HTTP 429: RESOURCE_EXHAUSTED: quota");

        let err: cosmos_core::Error = GeminiError::Parse("eof".to_string()).into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_configuration_errors() {
        let err: cosmos_core::Error = GeminiError::MissingApiKey.into();
        assert!(matches!(err, cosmos_core::Error::Config(_)));
    }
}
