//! Shared relay context.

use crate::builder::ServerEvent;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::registry::SessionRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use wsrelay_core::Message;

/// State shared by every connection task and the dispatcher.
///
/// Built once per server and cloned into each task.
#[derive(Clone)]
pub struct RelayContext {
    registry: Arc<SessionRegistry>,
    dispatch_tx: mpsc::UnboundedSender<Message>,
    next_connection_id: Arc<AtomicU64>,
    event_tx: Option<mpsc::Sender<ServerEvent>>,
}

impl RelayContext {
    /// Creates a context and the dispatcher consuming its queue.
    #[must_use]
    pub fn new() -> (Self, Dispatcher) {
        let registry = Arc::new(SessionRegistry::new());
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(Arc::clone(&registry), dispatch_rx);

        let ctx = Self {
            registry,
            dispatch_tx,
            next_connection_id: Arc::new(AtomicU64::new(1)),
            event_tx: None,
        };
        (ctx, dispatcher)
    }

    /// Attaches a sink for server events.
    #[must_use]
    pub fn with_events(mut self, event_tx: mpsc::Sender<ServerEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Returns the session registry.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Queues a chat message for the dispatcher.
    ///
    /// # Errors
    /// Returns `ServerError::Channel` if the dispatcher has stopped.
    pub fn enqueue(&self, message: Message) -> Result<(), ServerError> {
        self.dispatch_tx
            .send(message)
            .map_err(|_| ServerError::Channel {
                message: "dispatcher stopped".to_string(),
            })
    }

    /// Allocates a new connection ID.
    pub fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Publishes a server event. Events are dropped if nobody keeps up.
    pub fn emit(&self, event: ServerEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.try_send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        let (ctx, _dispatcher) = RelayContext::new();
        let other = ctx.clone();

        let a = ctx.next_connection_id();
        let b = other.next_connection_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_clones_share_registry() {
        let (ctx, _dispatcher) = RelayContext::new();
        let other = ctx.clone();
        let (tx, _rx) = mpsc::unbounded_channel();

        ctx.registry()
            .register("alice", crate::registry::SessionHandle::new(1, tx))
            .unwrap();
        assert!(other.registry().contains("alice"));
    }

    #[test]
    fn test_enqueue_after_dispatcher_dropped() {
        let (ctx, dispatcher) = RelayContext::new();
        drop(dispatcher);

        let result = ctx.enqueue(Message::chat("a", "b", "hi"));
        assert!(matches!(result, Err(ServerError::Channel { .. })));
    }

    #[tokio::test]
    async fn test_emit_without_sink_is_noop() {
        let (ctx, _dispatcher) = RelayContext::new();
        ctx.emit(ServerEvent::ConnectionClosed(1));

        let (tx, mut rx) = mpsc::channel(1);
        let ctx = ctx.with_events(tx);
        ctx.emit(ServerEvent::ConnectionClosed(2));
        ctx.emit(ServerEvent::ConnectionClosed(3));

        assert!(matches!(rx.recv().await, Some(ServerEvent::ConnectionClosed(2))));
        assert!(rx.try_recv().is_err());
    }
}
