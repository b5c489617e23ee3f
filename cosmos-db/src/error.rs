//! Error types for database operations

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Stored row does not hold a valid value
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for cosmos_core::Error {
    fn from(e: Error) -> Self {
        cosmos_core::Error::Storage(e.to_string())
    }
}
