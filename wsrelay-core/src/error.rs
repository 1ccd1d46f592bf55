//! Error types for wsrelay core operations.

use thiserror::Error;

/// Core error type for message encoding and decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload is not a valid message (bad JSON, missing field,
    /// or a `type` outside the closed set).
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    /// The payload is not valid UTF-8.
    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 {
        /// Byte offset where invalid UTF-8 was found.
        offset: usize,
    },
}

/// Result type alias for wsrelay core operations.
pub type Result<T> = std::result::Result<T, Error>;
