//! In-process connection pairs.
//!
//! Lets the relay core be exercised without a socket: whatever one end
//! sends, the other end receives, and closing or dropping one end ends the
//! other end's stream.

use crate::connection::Connection;
use crate::error::TransportError;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use wsrelay_core::Message;

enum Frame {
    Message(Message),
    Malformed(String),
}

/// One end of an in-memory connection.
pub struct MemoryConnection {
    tx: Option<mpsc::UnboundedSender<Frame>>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryConnection {
    /// Creates two connected ends.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(a_tx),
                rx: a_rx,
            },
            Self {
                tx: Some(b_tx),
                rx: b_rx,
            },
        )
    }

    /// Delivers a frame the peer cannot decode; its next `recv` fails with
    /// a protocol error.
    ///
    /// # Errors
    /// Returns `TransportError::ConnectionClosed` if the peer is gone.
    pub fn send_malformed(&mut self, reason: impl Into<String>) -> Result<(), TransportError> {
        self.push(Frame::Malformed(reason.into()))
    }

    fn push(&self, frame: Frame) -> Result<(), TransportError> {
        self.tx
            .as_ref()
            .ok_or(TransportError::ConnectionClosed)?
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        self.push(Frame::Message(message.clone()))
    }

    async fn recv(&mut self) -> Option<Result<Message, TransportError>> {
        match self.rx.recv().await? {
            Frame::Message(message) => Some(Ok(message)),
            Frame::Malformed(reason) => Some(Err(TransportError::invalid_frame(reason))),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_both_ways() {
        let (mut a, mut b) = MemoryConnection::pair();

        a.send(&Message::chat("a", "b", "ping")).await.unwrap();
        let got = b.recv().await.unwrap().unwrap();
        assert_eq!(got.text, "ping");

        b.send(&Message::chat("b", "a", "pong")).await.unwrap();
        let got = a.recv().await.unwrap().unwrap();
        assert_eq!(got.text, "pong");
    }

    #[tokio::test]
    async fn test_close_ends_peer_stream() {
        let (mut a, mut b) = MemoryConnection::pair();
        a.close().await.unwrap();

        assert!(b.recv().await.is_none());
        assert!(matches!(
            a.send(&Message::chat("a", "b", "late")).await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_drop_ends_peer_stream() {
        let (a, mut b) = MemoryConnection::pair();
        drop(a);
        assert!(b.recv().await.is_none());
        assert!(b.send(&Message::chat("b", "a", "x")).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_frame() {
        let (mut a, mut b) = MemoryConnection::pair();
        a.send_malformed("bad type").unwrap();

        let err = b.recv().await.unwrap().unwrap_err();
        assert!(err.is_protocol());
    }
}
