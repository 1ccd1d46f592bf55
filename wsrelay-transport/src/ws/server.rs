//! WebSocket server implementation.

use super::connection::WsConnection;
use crate::connection::{Accepted, DEFAULT_WS_PATH, Listener};
use crate::error::TransportError;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// Configuration for the WebSocket server.
#[derive(Debug, Clone)]
pub struct WsServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Request path accepted for the upgrade.
    pub path: String,
    /// Enable TCP_NODELAY.
    pub tcp_nodelay: bool,
}

impl WsServerConfig {
    /// Creates a new config bound to `bind_addr`, upgrading on `/ws`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            path: DEFAULT_WS_PATH.to_string(),
            tcp_nodelay: true,
        }
    }

    /// Sets the upgrade path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// WebSocket listener.
pub struct WsServer {
    listener: TcpListener,
    config: WsServerConfig,
}

impl WsServer {
    /// Binds to the configured address.
    ///
    /// # Errors
    /// Returns IO error if binding fails.
    pub async fn bind(config: WsServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        Ok(Self { listener, config })
    }
}

#[async_trait]
impl Listener for WsServer {
    type Connection = WsConnection<TcpStream>;

    async fn accept(&self) -> Result<Accepted, TransportError> {
        let (stream, peer_addr) = self.listener.accept().await?;
        Ok(Accepted { stream, peer_addr })
    }

    async fn upgrade(&self, accepted: Accepted) -> Result<Self::Connection, TransportError> {
        accepted.stream.set_nodelay(self.config.tcp_nodelay)?;

        let expected = self.config.path.as_str();
        let check_path = |request: &Request, response: Response| {
            if request.uri().path() == expected {
                Ok(response)
            } else {
                tracing::debug!("Refusing upgrade on path {}", request.uri().path());
                let mut refusal = ErrorResponse::new(Some(format!(
                    "no websocket endpoint at {}",
                    request.uri().path()
                )));
                *refusal.status_mut() = StatusCode::NOT_FOUND;
                Err(refusal)
            }
        };

        let stream = accept_hdr_async(accepted.stream, check_path).await?;
        Ok(WsConnection::new(stream, Some(accepted.peer_addr)))
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }
}
