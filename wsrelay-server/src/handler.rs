//! Per-connection handler.
//!
//! Each accepted connection runs one [`ConnectionHandler`] for its whole
//! lifetime. The handler reads messages, drives the
//! `Unregistered -> Active -> Closed` state machine, and writes whatever
//! the dispatcher queued for this connection.

use crate::builder::ServerEvent;
use crate::context::RelayContext;
use crate::error::ServerError;
use crate::registry::SessionHandle;
use tokio::sync::mpsc;
use wsrelay_core::{Message, MessageType, USER_ALREADY_EXISTS};
use wsrelay_transport::Connection;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, no identifier registered yet.
    Unregistered,
    /// Registered under the contained identifier.
    Active(String),
    /// Terminal; the handler has stopped reading.
    Closed,
}

/// Classification of an inbound message against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Registration request.
    NewClient,
    /// Chat to forward through the dispatcher.
    Chat,
    /// Orderly end of the session.
    EndSession,
    /// Anything not valid in the current state; logged and ignored.
    Unknown,
}

/// Classifies `message` given the connection's `state`.
#[must_use]
pub fn classify(state: &ConnectionState, message: &Message) -> Inbound {
    match (state, message.kind) {
        (ConnectionState::Unregistered, MessageType::NewClient) => Inbound::NewClient,
        (ConnectionState::Active(_), MessageType::Chat) => Inbound::Chat,
        (ConnectionState::Active(_), MessageType::EndSession) => Inbound::EndSession,
        _ => Inbound::Unknown,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Drives a single client connection.
pub struct ConnectionHandler<C> {
    connection_id: u64,
    conn: C,
    ctx: RelayContext,
    state: ConnectionState,
    outbound_tx: mpsc::UnboundedSender<Message>,
    outbound_rx: mpsc::UnboundedReceiver<Message>,
}

impl<C: Connection> ConnectionHandler<C> {
    /// Creates a handler for `conn`.
    #[must_use]
    pub fn new(conn: C, ctx: RelayContext) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            connection_id: ctx.next_connection_id(),
            conn,
            ctx,
            state: ConnectionState::Unregistered,
            outbound_tx,
            outbound_rx,
        }
    }

    /// Returns the connection ID.
    #[must_use]
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Runs the connection until it is closed by either side.
    ///
    /// The registry entry, if any, is removed before this returns, whatever
    /// ended the connection.
    ///
    /// # Errors
    /// Returns `ServerError` on read, write or protocol failure.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!(
            "Connection {} opened from {:?}",
            self.connection_id,
            self.conn.peer_addr()
        );
        self.ctx.emit(ServerEvent::ConnectionOpened(
            self.connection_id,
            self.conn.peer_addr(),
        ));

        let result = self.serve().await;
        self.teardown().await;
        result
    }

    async fn serve(&mut self) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                inbound = self.conn.recv() => {
                    match inbound {
                        Some(Ok(message)) => {
                            if self.on_message(message).await? == Flow::Close {
                                return Ok(());
                            }
                        }
                        Some(Err(e)) => {
                            if e.is_protocol() {
                                tracing::warn!(
                                    "Connection {} protocol error: {}",
                                    self.connection_id,
                                    e
                                );
                            } else {
                                tracing::error!("Connection {} read error: {}", self.connection_id, e);
                            }
                            return Err(e.into());
                        }
                        None => {
                            tracing::info!("Connection {} disconnected", self.connection_id);
                            return Ok(());
                        }
                    }
                }

                Some(message) = self.outbound_rx.recv() => {
                    if let Err(e) = self.conn.send(&message).await {
                        tracing::error!("Connection {} write error: {}", self.connection_id, e);
                        return Err(e.into());
                    }
                }
            }
        }
    }

    async fn on_message(&mut self, message: Message) -> Result<Flow, ServerError> {
        match classify(&self.state, &message) {
            Inbound::NewClient => self.on_new_client(&message).await,
            Inbound::Chat => {
                if let ConnectionState::Active(id) = &self.state
                    && message.sender != *id
                {
                    tracing::warn!(
                        "Connection {} registered as '{}' sent a chat as '{}', dropping it",
                        self.connection_id,
                        id,
                        message.sender
                    );
                    return Ok(Flow::Continue);
                }
                tracing::debug!(
                    "Queueing message {} -> {}",
                    message.sender,
                    message.receiver
                );
                self.ctx.enqueue(message)?;
                Ok(Flow::Continue)
            }
            Inbound::EndSession => {
                if let ConnectionState::Active(id) = &self.state
                    && message.sender != *id
                {
                    tracing::warn!(
                        "Connection {} ended session '{}' with sender '{}'",
                        self.connection_id,
                        id,
                        message.sender
                    );
                }
                self.release_session();
                Ok(Flow::Close)
            }
            Inbound::Unknown => {
                tracing::warn!(
                    "Unknown message: type {} on connection {} in state {:?}",
                    message.kind,
                    self.connection_id,
                    self.state
                );
                Ok(Flow::Continue)
            }
        }
    }

    async fn on_new_client(&mut self, message: &Message) -> Result<Flow, ServerError> {
        let Some(client_id) = message.registration_id() else {
            tracing::warn!(
                "Connection {} sent a registration without an identifier",
                self.connection_id
            );
            return Ok(Flow::Continue);
        };

        let handle = SessionHandle::new(self.connection_id, self.outbound_tx.clone());
        match self.ctx.registry().register(client_id, handle) {
            Ok(()) => {
                tracing::info!("New user added: {}", client_id);
                self.state = ConnectionState::Active(client_id.to_string());
                self.ctx.emit(ServerEvent::SessionRegistered(
                    self.connection_id,
                    client_id.to_string(),
                ));
                Ok(Flow::Continue)
            }
            Err(e) => {
                tracing::warn!("Rejecting connection {}: {}", self.connection_id, e);
                self.ctx.emit(ServerEvent::DuplicateRejected(
                    self.connection_id,
                    client_id.to_string(),
                ));
                self.conn
                    .send(&Message::server_error(client_id, USER_ALREADY_EXISTS))
                    .await?;
                Ok(Flow::Close)
            }
        }
    }

    /// Removes this connection's registry entry, if it still owns one.
    fn release_session(&mut self) {
        let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
        if let ConnectionState::Active(client_id) = state
            && self
                .ctx
                .registry()
                .unregister_connection(&client_id, self.connection_id)
        {
            tracing::info!("Removing user {} from pool", client_id);
            self.ctx
                .emit(ServerEvent::SessionEnded(self.connection_id, client_id));
        }
    }

    async fn teardown(&mut self) {
        self.release_session();
        if let Err(e) = self.conn.close().await {
            tracing::debug!("Connection {} close error: {}", self.connection_id, e);
        }
        tracing::info!("Connection {} closed", self.connection_id);
        self.ctx
            .emit(ServerEvent::ConnectionClosed(self.connection_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsrelay_core::{SERVER_ID, unreachable_text};
    use wsrelay_transport::MemoryConnection;

    fn relay() -> RelayContext {
        let (ctx, dispatcher) = RelayContext::new();
        tokio::spawn(dispatcher.run());
        ctx
    }

    fn spawn_handler(
        ctx: &RelayContext,
    ) -> (
        MemoryConnection,
        tokio::task::JoinHandle<Result<(), ServerError>>,
    ) {
        let (client, server) = MemoryConnection::pair();
        let handler = ConnectionHandler::new(server, ctx.clone());
        (client, tokio::spawn(handler.run()))
    }

    async fn register(ctx: &RelayContext, id: &str) -> MemoryConnection {
        let (mut client, _task) = spawn_handler(ctx);
        client.send(&Message::new_client(id)).await.unwrap();
        while !ctx.registry().contains(id) {
            tokio::task::yield_now().await;
        }
        client
    }

    #[test]
    fn test_classify() {
        let unregistered = ConnectionState::Unregistered;
        let active = ConnectionState::Active("alice".to_string());

        let new_client = Message::new_client("alice");
        let chat = Message::chat("alice", "bob", "hi");
        let end = Message::end_session("alice");
        let error = Message::server_error("bob", "oops");

        assert_eq!(classify(&unregistered, &new_client), Inbound::NewClient);
        assert_eq!(classify(&unregistered, &chat), Inbound::Unknown);
        assert_eq!(classify(&unregistered, &end), Inbound::Unknown);
        assert_eq!(classify(&unregistered, &error), Inbound::Unknown);

        assert_eq!(classify(&active, &new_client), Inbound::Unknown);
        assert_eq!(classify(&active, &chat), Inbound::Chat);
        assert_eq!(classify(&active, &end), Inbound::EndSession);
        assert_eq!(classify(&active, &error), Inbound::Unknown);

        assert_eq!(classify(&ConnectionState::Closed, &chat), Inbound::Unknown);
    }

    #[tokio::test]
    async fn test_chat_between_registered_clients() {
        let ctx = relay();
        let mut alice = register(&ctx, "alice").await;
        let mut bob = register(&ctx, "bob").await;

        let msg = Message::chat("alice", "bob", "hello");
        alice.send(&msg).await.unwrap();

        let got = bob.recv().await.unwrap().unwrap();
        assert_eq!(got, msg);
    }

    #[tokio::test]
    async fn test_unreachable_reply() {
        let ctx = relay();
        let mut alice = register(&ctx, "alice").await;

        alice
            .send(&Message::chat("alice", "carol", "hi"))
            .await
            .unwrap();

        let reply = alice.recv().await.unwrap().unwrap();
        assert_eq!(reply.kind, MessageType::Error);
        assert_eq!(reply.sender, SERVER_ID);
        assert_eq!(reply.text, unreachable_text("carol"));
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected_and_closed() {
        let ctx = relay();
        let _alice = register(&ctx, "alice").await;
        let original = ctx.registry().resolve("alice").unwrap().connection_id();

        let (mut intruder, task) = spawn_handler(&ctx);
        intruder.send(&Message::new_client("alice")).await.unwrap();

        let reply = intruder.recv().await.unwrap().unwrap();
        assert!(reply.is_identity_taken());
        assert_eq!(reply.receiver, "alice");
        assert!(intruder.recv().await.is_none());

        task.await.unwrap().unwrap();
        assert_eq!(
            ctx.registry().resolve("alice").unwrap().connection_id(),
            original
        );
    }

    #[tokio::test]
    async fn test_end_session_frees_identifier() {
        let ctx = relay();
        let mut alice = register(&ctx, "alice").await;

        alice.send(&Message::end_session("alice")).await.unwrap();
        assert!(alice.recv().await.is_none());
        assert!(!ctx.registry().contains("alice"));

        let _again = register(&ctx, "alice").await;
        assert!(ctx.registry().contains("alice"));
    }

    #[tokio::test]
    async fn test_disconnect_frees_identifier() {
        let ctx = relay();
        let (mut client, task) = spawn_handler(&ctx);
        client.send(&Message::new_client("alice")).await.unwrap();
        while !ctx.registry().contains("alice") {
            tokio::task::yield_now().await;
        }

        drop(client);
        task.await.unwrap().unwrap();
        assert!(!ctx.registry().contains("alice"));
    }

    #[tokio::test]
    async fn test_protocol_error_closes_and_cleans_up() {
        let ctx = relay();
        let (mut client, task) = spawn_handler(&ctx);
        client.send(&Message::new_client("alice")).await.unwrap();
        client.send_malformed("unknown type").unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ServerError::Transport(_))));
        assert!(!ctx.registry().contains("alice"));
    }

    #[tokio::test]
    async fn test_unregistered_chat_is_ignored() {
        let ctx = relay();
        let mut bob = register(&ctx, "bob").await;
        let (mut client, _task) = spawn_handler(&ctx);

        client
            .send(&Message::chat("mallory", "bob", "psst"))
            .await
            .unwrap();
        client.send(&Message::new_client("mallory")).await.unwrap();
        client
            .send(&Message::chat("mallory", "bob", "hello"))
            .await
            .unwrap();

        let got = bob.recv().await.unwrap().unwrap();
        assert_eq!(got.text, "hello");
    }

    #[tokio::test]
    async fn test_second_registration_on_active_connection_is_ignored() {
        let ctx = relay();
        let mut alice = register(&ctx, "alice").await;
        alice.send(&Message::new_client("alias")).await.unwrap();
        alice.send(&Message::end_session("alice")).await.unwrap();

        assert!(alice.recv().await.is_none());
        assert!(!ctx.registry().contains("alias"));
        assert_eq!(ctx.registry().count(), 0);
    }

    #[tokio::test]
    async fn test_chat_with_foreign_sender_is_dropped() {
        let ctx = relay();
        let mut bob = register(&ctx, "bob").await;
        let mut alice = register(&ctx, "alice").await;

        alice
            .send(&Message::chat("bob", "carol", "as bob"))
            .await
            .unwrap();
        alice
            .send(&Message::chat("alice", "carol", "as alice"))
            .await
            .unwrap();

        let reply = alice.recv().await.unwrap().unwrap();
        assert_eq!(reply.kind, MessageType::Error);
        assert_eq!(reply.text, unreachable_text("carol"));

        alice.send(&Message::chat("alice", "bob", "hi")).await.unwrap();
        let got = bob.recv().await.unwrap().unwrap();
        assert_eq!(got.sender, "alice");
        assert_eq!(got.text, "hi");
    }

    #[tokio::test]
    async fn test_mismatched_end_session_only_ends_own_session() {
        let ctx = relay();
        let _bob = register(&ctx, "bob").await;
        let mut alice = register(&ctx, "alice").await;

        alice.send(&Message::end_session("bob")).await.unwrap();
        assert!(alice.recv().await.is_none());

        assert!(!ctx.registry().contains("alice"));
        assert!(ctx.registry().contains("bob"));
    }

    #[test]
    fn test_handler_state_accessors() {
        let (ctx, _dispatcher) = RelayContext::new();
        let (_client, server) = MemoryConnection::pair();
        let handler = ConnectionHandler::new(server, ctx);
        assert_eq!(handler.state(), &ConnectionState::Unregistered);
        assert!(handler.connection_id() > 0);
    }
}
