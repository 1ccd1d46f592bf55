//! Error types for client operations.

use crate::input::InputError;
use thiserror::Error;

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] wsrelay_transport::TransportError),

    /// Connection closed by server.
    #[error("connection closed")]
    ConnectionClosed,

    /// The server refused the identifier because it is already in use.
    #[error("client id '{0}' is already in use")]
    IdentityTaken(String),

    /// No client identifier was configured.
    #[error("a client id is required")]
    EmptyClientId,

    /// An input line could not be turned into a message.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The transport selected is not compiled in.
    #[error("transport not available: {0}")]
    Unsupported(String),

    /// Channel error.
    #[error("channel error")]
    Channel,
}
