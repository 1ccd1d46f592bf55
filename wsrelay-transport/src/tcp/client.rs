//! Client side of the framed TCP transport.

use super::framing::DEFAULT_MAX_FRAME_SIZE;
use super::server::TcpConnection;
use crate::error::TransportError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// URL scheme accepted in front of a TCP server address.
pub const TCP_SCHEME: &str = "tcp://";

/// Where and how to reach a relay server over TCP.
#[derive(Debug, Clone)]
pub struct TcpClientConfig {
    /// Relay server address.
    pub server_addr: SocketAddr,
    /// Give up connecting after this long.
    pub connect_timeout: Duration,
    /// Largest JSON body accepted from the server.
    pub max_frame_size: usize,
    /// Enable TCP_NODELAY.
    pub tcp_nodelay: bool,
}

impl TcpClientConfig {
    /// Targets the relay at `server_addr` with default limits.
    #[must_use]
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            connect_timeout: Duration::from_secs(5),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            tcp_nodelay: true,
        }
    }

    /// Parses `host:port`, optionally written as `tcp://host:port`.
    ///
    /// # Errors
    /// Returns `TransportError::AddrParse` if the address is not a socket
    /// address.
    pub fn from_url(url: &str) -> Result<Self, TransportError> {
        let addr = url.strip_prefix(TCP_SCHEME).unwrap_or(url);
        Ok(Self::new(addr.parse()?))
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the maximum frame size.
    #[must_use]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

/// Opens a framed connection to the relay.
///
/// # Errors
/// Returns `TransportError::ConnectTimeout` if the server does not answer in
/// time, or `TransportError::Io` if it refuses.
pub async fn connect(config: TcpClientConfig) -> Result<TcpConnection, TransportError> {
    let stream = tokio::time::timeout(
        config.connect_timeout,
        TcpStream::connect(config.server_addr),
    )
    .await
    .map_err(|_| TransportError::ConnectTimeout)?
    .map_err(TransportError::Io)?;

    stream.set_nodelay(config.tcp_nodelay)?;
    let peer_addr = stream.peer_addr()?;

    Ok(TcpConnection::new(stream, peer_addr, config.max_frame_size))
}
