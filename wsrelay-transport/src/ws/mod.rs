//! WebSocket transport module.
//!
//! Each text (or binary) frame carries exactly one JSON-encoded message.
//! A close frame ends the stream.

pub mod client;
pub mod connection;
pub mod server;

pub use client::{WsClientConnection, connect};
pub use connection::WsConnection;
pub use server::{WsServer, WsServerConfig};
