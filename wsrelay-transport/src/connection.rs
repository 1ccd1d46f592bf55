//! Transport traits consumed by the relay core.

use crate::error::TransportError;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use wsrelay_core::Message;

/// Default WebSocket endpoint path.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// A duplex, message-framed channel to one peer.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Sends one message to the peer.
    ///
    /// # Errors
    /// Returns `TransportError` if the write fails.
    async fn send(&mut self, message: &Message) -> Result<(), TransportError>;

    /// Receives the next message from the peer.
    ///
    /// # Returns
    /// `Some(Ok(message))` on success, `Some(Err(_))` on a read or protocol
    /// failure and `None` once the peer has closed the connection.
    async fn recv(&mut self) -> Option<Result<Message, TransportError>>;

    /// Closes the connection.
    ///
    /// # Errors
    /// Returns `TransportError` if the close handshake fails.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Returns the peer address, if the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// A raw TCP stream accepted by a [`Listener`] but not yet upgraded.
#[derive(Debug)]
pub struct Accepted {
    /// Accepted socket.
    pub stream: TcpStream,
    /// Peer address.
    pub peer_addr: SocketAddr,
}

/// Accepts inbound connections.
///
/// Accepting is split in two steps so the accept loop never waits on a
/// slow peer's handshake: [`Listener::accept`] only takes the socket, and
/// [`Listener::upgrade`] runs on the connection's own task.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Connection type produced by this listener.
    type Connection: Connection;

    /// Accepts the next raw socket.
    ///
    /// # Errors
    /// Returns `TransportError` if accept fails.
    async fn accept(&self) -> Result<Accepted, TransportError>;

    /// Completes the transport handshake on an accepted socket.
    ///
    /// # Errors
    /// Returns `TransportError` if the handshake fails.
    async fn upgrade(&self, accepted: Accepted) -> Result<Self::Connection, TransportError>;

    /// Returns the local address the listener is bound to.
    ///
    /// # Errors
    /// Returns `TransportError` if the address cannot be read.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}

/// Selects the wire transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// WebSocket, upgraded on the given request path.
    WebSocket {
        /// Request path accepted for the upgrade.
        path: String,
    },
    /// Length-prefixed JSON frames over plain TCP.
    Tcp,
}

impl TransportKind {
    /// WebSocket transport on the default `/ws` path.
    #[must_use]
    pub fn websocket() -> Self {
        Self::WebSocket {
            path: DEFAULT_WS_PATH.to_string(),
        }
    }
}

impl Default for TransportKind {
    fn default() -> Self {
        Self::websocket()
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ws" | "websocket" => Ok(Self::websocket()),
            "tcp" => Ok(Self::Tcp),
            other => Err(format!("unknown transport '{other}', expected 'ws' or 'tcp'")),
        }
    }
}
