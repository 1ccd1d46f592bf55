//! WebSocket client implementation.

use super::connection::WsConnection;
use crate::error::TransportError;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, connect_async};

/// Client-side WebSocket connection.
pub type WsClientConnection = WsConnection<MaybeTlsStream<TcpStream>>;

/// Connects to a relay server at `url` (e.g. `ws://localhost:3030/ws`).
///
/// # Errors
/// Returns `TransportError` if the connection or handshake fails or times
/// out.
pub async fn connect(url: &str, timeout: Duration) -> Result<WsClientConnection, TransportError> {
    let (stream, _response) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| TransportError::ConnectTimeout)??;

    let peer_addr = match stream.get_ref() {
        MaybeTlsStream::Plain(tcp) => tcp.peer_addr().ok(),
        _ => None,
    };

    Ok(WsConnection::new(stream, peer_addr))
}
