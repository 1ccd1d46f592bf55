//! Server builder and main server implementation.

use crate::context::RelayContext;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::handler::ConnectionHandler;
use crate::registry::SessionRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use wsrelay_transport::{Accepted, Listener, TransportKind};

/// Default bind address.
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 3030);

/// Builder for configuring and creating a server.
pub struct ServerBuilder {
    bind_addr: SocketAddr,
    transport: TransportKind,
    max_connections: usize,
    max_frame_size: usize,
    channel_capacity: usize,
}

impl ServerBuilder {
    /// Creates a new server builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            transport: TransportKind::default(),
            max_connections: 1000,
            max_frame_size: 64 * 1024,
            channel_capacity: 4096,
        }
    }

    /// Sets the bind address.
    #[must_use]
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the wire transport.
    #[must_use]
    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the maximum number of concurrent connections.
    #[must_use]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the maximum frame size (TCP transport).
    #[must_use]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Builds the server and handle.
    #[must_use]
    pub fn build(self) -> (Server, ServerHandle) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(self.channel_capacity.max(1));
        let (ctx, dispatcher) = RelayContext::new();
        let ctx = ctx.with_events(event_tx);

        let server = Server {
            bind_addr: self.bind_addr,
            transport: self.transport,
            max_connections: self.max_connections,
            max_frame_size: self.max_frame_size,
            cmd_rx,
            ctx: ctx.clone(),
            dispatcher: Some(dispatcher),
            active: Arc::new(AtomicUsize::new(0)),
        };

        let handle = ServerHandle {
            cmd_tx,
            event_rx,
            ctx,
        };

        (server, handle)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The relay server.
pub struct Server {
    bind_addr: SocketAddr,
    transport: TransportKind,
    max_connections: usize,
    max_frame_size: usize,
    cmd_rx: mpsc::UnboundedReceiver<ServerCommand>,
    ctx: RelayContext,
    dispatcher: Option<Dispatcher>,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Binds the configured transport and runs the accept loop until
    /// shutdown is requested.
    ///
    /// # Errors
    /// Returns `ServerError` if the listener cannot be bound.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        match self.transport.clone() {
            #[cfg(feature = "ws")]
            TransportKind::WebSocket { path } => {
                use wsrelay_transport::ws::{WsServer, WsServerConfig};
                let config = WsServerConfig::new(self.bind_addr).path(path);
                let listener = WsServer::bind(config).await?;
                self.serve(listener).await
            }
            #[cfg(feature = "tcp")]
            TransportKind::Tcp => {
                use wsrelay_transport::tcp::{TcpServer, TcpServerConfig};
                let config = TcpServerConfig::new(self.bind_addr).max_frame_size(self.max_frame_size);
                let listener = TcpServer::bind(config).await?;
                self.serve(listener).await
            }
            #[allow(unreachable_patterns)]
            other => Err(ServerError::Unsupported(format!("{other:?}"))),
        }
    }

    /// Runs the accept loop on an already bound listener.
    ///
    /// # Errors
    /// Returns `ServerError` if the listener's address cannot be read.
    pub async fn serve<L: Listener>(&mut self, listener: L) -> Result<(), ServerError> {
        let listener = Arc::new(listener);
        let local_addr = listener.local_addr()?;
        tracing::info!("Server listening on {}", local_addr);
        self.ctx.emit(ServerEvent::Listening(local_addr));

        if let Some(dispatcher) = self.dispatcher.take() {
            tokio::spawn(dispatcher.run());
        }

        let mut commands_open = true;
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok(accepted) => self.handle_connection(&listener, accepted),
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                            self.ctx.emit(ServerEvent::Error(e.to_string()));
                        }
                    }
                }

                cmd = self.cmd_rx.recv(), if commands_open => {
                    match cmd {
                        Some(ServerCommand::Shutdown) => {
                            tracing::info!("Server shutdown requested");
                            return Ok(());
                        }
                        None => commands_open = false,
                    }
                }
            }
        }
    }

    /// Returns the session registry.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        self.ctx.registry()
    }

    fn handle_connection<L: Listener>(&self, listener: &Arc<L>, accepted: Accepted) {
        if self.active.load(Ordering::Acquire) >= self.max_connections {
            tracing::warn!("Max connections reached, rejecting {}", accepted.peer_addr);
            return;
        }

        self.active.fetch_add(1, Ordering::AcqRel);
        let active = Arc::clone(&self.active);
        let listener = Arc::clone(listener);
        let ctx = self.ctx.clone();

        tokio::spawn(async move {
            let peer_addr = accepted.peer_addr;
            match listener.upgrade(accepted).await {
                Ok(conn) => {
                    let handler = ConnectionHandler::new(conn, ctx);
                    let connection_id = handler.connection_id();
                    if let Err(e) = handler.run().await {
                        tracing::error!("Connection {} error: {}", connection_id, e);
                    }
                }
                Err(e) => tracing::warn!("Handshake with {} failed: {}", peer_addr, e),
            }
            active.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

/// Handle for controlling the server from outside.
pub struct ServerHandle {
    cmd_tx: mpsc::UnboundedSender<ServerCommand>,
    event_rx: mpsc::Receiver<ServerEvent>,
    ctx: RelayContext,
}

impl ServerHandle {
    /// Requests server shutdown. Live connections are not interrupted.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(ServerCommand::Shutdown);
    }

    /// Waits for the next server event.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.event_rx.recv().await
    }

    /// Polls for server events.
    pub fn poll_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        std::iter::from_fn(|| self.event_rx.try_recv().ok())
    }

    /// Returns the session registry.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        self.ctx.registry()
    }
}

/// Commands that can be sent to the server.
#[derive(Debug)]
pub enum ServerCommand {
    /// Stop accepting connections.
    Shutdown,
}

/// Events emitted by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The listener is bound.
    Listening(SocketAddr),
    /// A connection finished its transport handshake.
    ConnectionOpened(u64, Option<SocketAddr>),
    /// A client identifier was registered on a connection.
    SessionRegistered(u64, String),
    /// A registration was refused because the identifier is taken.
    DuplicateRejected(u64, String),
    /// A session was removed from the registry.
    SessionEnded(u64, String),
    /// A connection was closed.
    ConnectionClosed(u64),
    /// An accept error occurred.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_builder_defaults() {
        let builder = ServerBuilder::new();
        assert_eq!(builder.bind_addr.port(), 3030);
        assert_eq!(builder.transport, TransportKind::websocket());
        assert_eq!(builder.max_connections, 1000);
        assert_eq!(builder.max_frame_size, 64 * 1024);
        assert_eq!(builder.channel_capacity, 4096);
    }

    #[test]
    fn test_server_builder_setters() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let builder = ServerBuilder::default()
            .bind(addr)
            .transport(TransportKind::Tcp)
            .max_connections(10)
            .max_frame_size(1024)
            .channel_capacity(8);

        assert_eq!(builder.bind_addr, addr);
        assert_eq!(builder.transport, TransportKind::Tcp);
        assert_eq!(builder.max_connections, 10);
        assert_eq!(builder.max_frame_size, 1024);
        assert_eq!(builder.channel_capacity, 8);
    }

    #[test]
    fn test_build_shares_registry_with_handle() {
        let (server, handle) = ServerBuilder::new().build();
        assert_eq!(server.registry().count(), 0);
        assert_eq!(handle.registry().count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_accept_loop() {
        let (mut server, mut handle) = ServerBuilder::new()
            .bind("127.0.0.1:0".parse().unwrap())
            .build();

        let task = tokio::spawn(async move { server.run().await });

        match handle.next_event().await {
            Some(ServerEvent::Listening(addr)) => assert_ne!(addr.port(), 0),
            other => panic!("unexpected event: {other:?}"),
        }

        handle.shutdown();
        task.await.unwrap().unwrap();
    }
}
