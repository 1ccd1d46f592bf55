//! WebSocket connection carrying one JSON message per frame.

use crate::connection::Connection;
use crate::error::TransportError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use wsrelay_core::Message;

/// A WebSocket connection to one peer.
pub struct WsConnection<S> {
    inner: WebSocketStream<S>,
    peer_addr: Option<SocketAddr>,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an established WebSocket stream.
    #[must_use]
    pub fn new(inner: WebSocketStream<S>, peer_addr: Option<SocketAddr>) -> Self {
        Self { inner, peer_addr }
    }
}

#[async_trait]
impl<S> Connection for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let json = wsrelay_core::encode(message)?;
        self.inner.send(WsMessage::text(json)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Message, TransportError>> {
        loop {
            match self.inner.next().await? {
                Ok(WsMessage::Text(text)) => {
                    return Some(wsrelay_core::decode_str(text.as_str()).map_err(Into::into));
                }
                Ok(WsMessage::Binary(data)) => {
                    return Some(wsrelay_core::decode(&data).map_err(Into::into));
                }
                Ok(WsMessage::Close(_)) => return None,
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => continue,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.inner.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
}
