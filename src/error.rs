//! Error types for Retell

use thiserror::Error;

/// Result type alias for Retell operations
pub type Result<T> = std::result::Result<T, RetellError>;

/// Main error type for Retell
#[derive(Error, Debug)]
pub enum RetellError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Recall error: {0}")]
    Recall(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid generation output: {0}")]
    InvalidOutput(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    #[cfg(feature = "remote")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request error: {0}")]
    #[cfg(not(feature = "remote"))]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),
}

impl RetellError {
    /// Check if the operation that produced this error may be retried.
    ///
    /// Transport failures and rate limits are transient; store and write
    /// failures are safe to retry because upsert is idempotent by id.
    /// Validation failures (`InvalidOutput`) and exhausted generation
    /// attempts (`Generation`) are terminal for the current message.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetellError::Http(_)
                | RetellError::Upstream(_)
                | RetellError::RateLimited(_)
                | RetellError::Store(_)
                | RetellError::Write(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(RetellError::RateLimited(30).is_retryable());
        assert!(RetellError::Upstream("503".into()).is_retryable());
        assert!(RetellError::Store("connection lost".into()).is_retryable());
        assert!(RetellError::Write("upsert failed".into()).is_retryable());

        assert!(!RetellError::InvalidOutput("empty".into()).is_retryable());
        assert!(!RetellError::Generation("gave up".into()).is_retryable());
        assert!(!RetellError::Recall("embed failed".into()).is_retryable());
        assert!(!RetellError::InvalidInput("empty text".into()).is_retryable());
    }
}
