//! Client builder and main client implementation.

use crate::error::ClientError;
use crate::input::parse_input;
use std::time::Duration;
use tokio::sync::mpsc;
use wsrelay_core::{Message, MessageType};
use wsrelay_transport::{Connection, TransportKind};

/// Default server URL.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:3030/ws";

/// Builder for configuring and creating a client.
pub struct ClientBuilder {
    server: String,
    client_id: String,
    transport: TransportKind,
    connect_timeout: Duration,
}

impl ClientBuilder {
    /// Creates a client builder for `client_id` talking to `server`.
    ///
    /// `server` is a `ws://` URL for the WebSocket transport or a
    /// `host:port` address for the TCP transport.
    #[must_use]
    pub fn new(server: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            client_id: client_id.into(),
            transport: TransportKind::default(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the wire transport.
    #[must_use]
    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the client and handle.
    #[must_use]
    pub fn build(self) -> (Client, ClientHandle) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let client = Client {
            server: self.server,
            client_id: self.client_id,
            transport: self.transport,
            connect_timeout: self.connect_timeout,
            cmd_rx,
            event_tx,
        };

        let handle = ClientHandle { cmd_tx, event_rx };

        (client, handle)
    }
}

/// The relay client.
pub struct Client {
    server: String,
    client_id: String,
    transport: TransportKind,
    connect_timeout: Duration,
    cmd_rx: mpsc::UnboundedReceiver<ClientCommand>,
    event_tx: mpsc::UnboundedSender<ClientEvent>,
}

impl Client {
    /// Returns the configured client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Connects, registers and runs the session until it ends.
    ///
    /// # Errors
    /// Returns `ClientError::IdentityTaken` if the server refuses the
    /// identifier, or another `ClientError` if the connection fails.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        if self.client_id.is_empty() {
            return Err(ClientError::EmptyClientId);
        }

        tracing::info!(
            "Connecting to {} with clientId: {}",
            self.server,
            self.client_id
        );

        match self.transport.clone() {
            #[cfg(feature = "ws")]
            TransportKind::WebSocket { .. } => {
                let conn =
                    wsrelay_transport::ws::connect(&self.server, self.connect_timeout).await?;
                self.run_on(conn).await
            }
            #[cfg(feature = "tcp")]
            TransportKind::Tcp => {
                use wsrelay_transport::tcp::{TcpClientConfig, connect};
                let config =
                    TcpClientConfig::from_url(&self.server)?.connect_timeout(self.connect_timeout);
                let conn = connect(config).await?;
                self.run_on(conn).await
            }
            #[allow(unreachable_patterns)]
            other => Err(ClientError::Unsupported(format!("{other:?}"))),
        }
    }

    /// Runs the session over an established connection.
    ///
    /// # Errors
    /// See [`Client::run`].
    pub async fn run_on<C: Connection>(&mut self, mut conn: C) -> Result<(), ClientError> {
        if self.client_id.is_empty() {
            return Err(ClientError::EmptyClientId);
        }

        conn.send(&Message::new_client(&self.client_id)).await?;
        let _ = self.event_tx.send(ClientEvent::Connected);

        let result = self.session(&mut conn).await;
        if let Err(e) = conn.close().await {
            tracing::debug!("Close error: {}", e);
        }
        let _ = self.event_tx.send(ClientEvent::Disconnected);
        result
    }

    async fn session<C: Connection>(&mut self, conn: &mut C) -> Result<(), ClientError> {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(ClientCommand::Send { receiver, text }) => {
                            conn.send(&Message::chat(self.client_id.as_str(), receiver, text))
                                .await?;
                        }
                        Some(ClientCommand::Disconnect) | None => {
                            self.end_session(conn).await;
                            return Ok(());
                        }
                    }
                }

                inbound = conn.recv() => {
                    match inbound {
                        Some(Ok(message)) => self.on_message(conn, message).await?,
                        Some(Err(e)) => {
                            tracing::error!("Error reading message: {}", e);
                            return Err(e.into());
                        }
                        None => return Err(ClientError::ConnectionClosed),
                    }
                }
            }
        }
    }

    async fn on_message<C: Connection>(
        &mut self,
        conn: &mut C,
        message: Message,
    ) -> Result<(), ClientError> {
        match message.kind {
            MessageType::Chat => {
                let _ = self.event_tx.send(ClientEvent::Message(message));
                Ok(())
            }
            MessageType::Error => {
                let taken = message.is_identity_taken();
                let _ = self.event_tx.send(ClientEvent::ServerError(message));
                if taken {
                    tracing::warn!("Client id {} is already in use", self.client_id);
                    self.end_session(conn).await;
                    return Err(ClientError::IdentityTaken(self.client_id.clone()));
                }
                Ok(())
            }
            other => {
                tracing::debug!("Ignoring {} message from server", other);
                Ok(())
            }
        }
    }

    async fn end_session<C: Connection>(&self, conn: &mut C) {
        if let Err(e) = conn.send(&Message::end_session(&self.client_id)).await {
            tracing::warn!("Error to send end session message to server: {}", e);
        }
    }
}

/// Handle for sending messages and receiving events.
pub struct ClientHandle {
    cmd_tx: mpsc::UnboundedSender<ClientCommand>,
    event_rx: mpsc::UnboundedReceiver<ClientEvent>,
}

impl ClientHandle {
    /// Sends a chat message to `receiver`.
    ///
    /// # Errors
    /// Returns `ClientError::Channel` if the client has stopped.
    pub fn send(
        &self,
        receiver: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.cmd_tx
            .send(ClientCommand::Send {
                receiver: receiver.into(),
                text: text.into(),
            })
            .map_err(|_| ClientError::Channel)
    }

    /// Parses a `to:<id> <text>` line and sends it.
    ///
    /// # Errors
    /// Returns `ClientError::Input` for a malformed line (nothing is sent)
    /// or `ClientError::Channel` if the client has stopped.
    pub fn send_line(&self, line: &str) -> Result<(), ClientError> {
        let outgoing = parse_input(line)?;
        self.send(outgoing.receiver, outgoing.text)
    }

    /// Ends the session: the client sends `EndSession` and disconnects.
    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect);
    }

    /// Waits for the next event.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.event_rx.recv().await
    }

    /// Polls for events (non-blocking).
    pub fn poll(&mut self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }
}

/// Commands that can be sent to the client.
#[derive(Debug)]
pub enum ClientCommand {
    /// Send a chat message.
    Send {
        /// Receiver identifier.
        receiver: String,
        /// Message text.
        text: String,
    },
    /// End the session and disconnect.
    Disconnect,
}

/// Events emitted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Connected and registration sent.
    Connected,
    /// Chat message received.
    Message(Message),
    /// Error reply from the server.
    ServerError(Message),
    /// Disconnected from the server.
    Disconnected,
}
