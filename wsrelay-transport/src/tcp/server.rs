//! TCP server implementation.

use super::framing::{DEFAULT_MAX_FRAME_SIZE, JsonFrameCodec};
use crate::connection::{Accepted, Connection, Listener};
use crate::error::TransportError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use wsrelay_core::Message;

/// Configuration for TCP server.
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum frame size in bytes.
    pub max_frame_size: usize,
    /// Enable TCP_NODELAY.
    pub tcp_nodelay: bool,
}

impl TcpServerConfig {
    /// Creates a new server config with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            tcp_nodelay: true,
        }
    }

    /// Sets the maximum frame size.
    #[must_use]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

/// TCP listener producing framed JSON connections.
pub struct TcpServer {
    listener: TcpListener,
    config: TcpServerConfig,
}

impl TcpServer {
    /// Binds to the configured address.
    ///
    /// # Errors
    /// Returns IO error if binding fails.
    pub async fn bind(config: TcpServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        Ok(Self { listener, config })
    }
}

#[async_trait]
impl Listener for TcpServer {
    type Connection = TcpConnection;

    async fn accept(&self) -> Result<Accepted, TransportError> {
        let (stream, peer_addr) = self.listener.accept().await?;
        Ok(Accepted { stream, peer_addr })
    }

    async fn upgrade(&self, accepted: Accepted) -> Result<TcpConnection, TransportError> {
        accepted.stream.set_nodelay(self.config.tcp_nodelay)?;
        Ok(TcpConnection::new(
            accepted.stream,
            accepted.peer_addr,
            self.config.max_frame_size,
        ))
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }
}

/// A framed TCP connection, used on both the server and the client side.
pub struct TcpConnection {
    framed: Framed<TcpStream, JsonFrameCodec>,
    peer_addr: SocketAddr,
}

impl TcpConnection {
    pub(crate) fn new(stream: TcpStream, peer_addr: SocketAddr, max_frame_size: usize) -> Self {
        Self {
            framed: Framed::new(stream, JsonFrameCodec::new(max_frame_size)),
            peer_addr,
        }
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        self.framed.send(message).await
    }

    async fn recv(&mut self) -> Option<Result<Message, TransportError>> {
        self.framed.next().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::<&Message>::close(&mut self.framed).await
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer_addr)
    }
}
