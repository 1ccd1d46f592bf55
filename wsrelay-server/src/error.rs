//! Error types for server operations.

use thiserror::Error;

/// Error type for server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] wsrelay_transport::TransportError),

    /// The requested transport is not compiled in.
    #[error("transport not available: {0}")]
    Unsupported(String),

    /// Channel error.
    #[error("channel error: {message}")]
    Channel {
        /// Error message.
        message: String,
    },
}

/// Outcome of a registry operation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The identifier is already bound to a live connection.
    #[error("client '{0}' already exists")]
    AlreadyExists(String),

    /// No live connection is bound to the identifier.
    #[error("client '{0}' is not connected")]
    NotFound(String),
}

/// Error returned when a message cannot be queued for a connection.
#[derive(Debug, Clone, Error)]
#[error("send error: {message}")]
pub struct SendError {
    /// Error message.
    pub message: String,
}
