//! Error types for the evaluation feed.

use thiserror::Error;

/// Main error type for feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to open watch: {0}")]
    WatchOpen(String),

    #[error("Code parameter must not be empty")]
    EmptyCode,

    #[error("Code exceeds maximum length of {max} characters (got {len})")]
    CodeTooLong { len: usize, max: usize },

    #[error("Scoring service error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Serialization(e.to_string())
    }
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
