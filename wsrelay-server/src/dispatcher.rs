//! Dispatch loop routing chat messages to their receivers.
//!
//! Connection handlers only enqueue; this task is the single consumption
//! path, so messages from one sender to one receiver keep their order.

use crate::registry::SessionRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use wsrelay_core::{Message, unreachable_text};

/// Outcome of dispatching one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the receiver's connection.
    Delivered,
    /// The receiver was registered but its connection had gone away.
    Dropped,
    /// The receiver is not connected; an error reply went to the sender.
    Unreachable,
    /// The receiver is not connected and neither is the sender.
    ReplyDropped,
}

/// Consumes the dispatch queue.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    queue: mpsc::UnboundedReceiver<Message>,
}

impl Dispatcher {
    /// Creates a dispatcher reading from `queue`.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, queue: mpsc::UnboundedReceiver<Message>) -> Self {
        Self { registry, queue }
    }

    /// Runs until every queue sender has been dropped.
    pub async fn run(mut self) {
        tracing::debug!("Dispatcher started");
        while let Some(message) = self.queue.recv().await {
            self.dispatch(message);
        }
        tracing::debug!("Dispatcher stopped");
    }

    /// Routes a single chat message.
    pub fn dispatch(&self, message: Message) -> Delivery {
        let receiver = message.receiver.clone();
        let sender = message.sender.clone();

        match self.registry.resolve(&receiver) {
            Ok(handle) => match handle.deliver(message) {
                Ok(()) => {
                    tracing::debug!("Routed message {} -> {}", sender, receiver);
                    Delivery::Delivered
                }
                Err(e) => {
                    tracing::warn!("Dropping message {} -> {}: {}", sender, receiver, e);
                    Delivery::Dropped
                }
            },
            Err(_) => {
                tracing::info!("Receiver {} is not connected", receiver);
                let reply = Message::server_error(sender.as_str(), unreachable_text(&receiver));

                match self.registry.resolve(&sender) {
                    Ok(handle) if handle.deliver(reply).is_ok() => Delivery::Unreachable,
                    _ => {
                        tracing::debug!("Sender {} is gone, dropping error reply", sender);
                        Delivery::ReplyDropped
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SessionHandle;
    use wsrelay_core::{MessageType, SERVER_ID};

    fn registered(
        registry: &SessionRegistry,
        id: &str,
        connection_id: u64,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry
            .register(id, SessionHandle::new(connection_id, tx))
            .unwrap();
        rx
    }

    fn dispatcher() -> (Arc<SessionRegistry>, Dispatcher) {
        let registry = Arc::new(SessionRegistry::new());
        let (_tx, rx) = mpsc::unbounded_channel();
        (Arc::clone(&registry), Dispatcher::new(registry, rx))
    }

    #[test]
    fn test_delivers_verbatim() {
        let (registry, dispatcher) = dispatcher();
        let _alice = registered(&registry, "alice", 1);
        let mut bob = registered(&registry, "bob", 2);

        let msg = Message::chat("alice", "bob", "hello");
        assert_eq!(dispatcher.dispatch(msg.clone()), Delivery::Delivered);

        assert_eq!(bob.try_recv().unwrap(), msg);
    }

    #[test]
    fn test_unreachable_replies_to_sender() {
        let (registry, dispatcher) = dispatcher();
        let mut alice = registered(&registry, "alice", 1);

        let outcome = dispatcher.dispatch(Message::chat("alice", "carol", "hi"));
        assert_eq!(outcome, Delivery::Unreachable);

        let reply = alice.try_recv().unwrap();
        assert_eq!(reply.kind, MessageType::Error);
        assert_eq!(reply.sender, SERVER_ID);
        assert_eq!(reply.receiver, "alice");
        assert_eq!(reply.text, "carol is not connected on server");
        assert!(alice.try_recv().is_err());
    }

    #[test]
    fn test_unreachable_with_sender_gone() {
        let (_registry, dispatcher) = dispatcher();
        let outcome = dispatcher.dispatch(Message::chat("alice", "carol", "hi"));
        assert_eq!(outcome, Delivery::ReplyDropped);
    }

    #[test]
    fn test_closed_receiver_is_dropped() {
        let (registry, dispatcher) = dispatcher();
        let mut alice = registered(&registry, "alice", 1);
        drop(registered(&registry, "bob", 2));

        let outcome = dispatcher.dispatch(Message::chat("alice", "bob", "hi"));
        assert_eq!(outcome, Delivery::Dropped);
        assert!(alice.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_preserves_order_per_pair() {
        let registry = Arc::new(SessionRegistry::new());
        let mut bob = registered(&registry, "bob", 2);
        let _alice = registered(&registry, "alice", 1);
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Dispatcher::new(Arc::clone(&registry), rx).run());

        for i in 0..50 {
            tx.send(Message::chat("alice", "bob", i.to_string())).unwrap();
        }
        drop(tx);
        task.await.unwrap();

        for i in 0..50 {
            assert_eq!(bob.recv().await.unwrap().text, i.to_string());
        }
    }
}
