//! The relay message and its type tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved pseudo-identity used for server-originated messages.
pub const SERVER_ID: &str = "server";

/// Error text sent when a client registers an identifier already in use.
pub const USER_ALREADY_EXISTS: &str = "User already exists!";

/// Payload carried by an `EndSession` message.
pub const END_SESSION_TEXT: &str = "Session end";

/// Returns the error text sent back when `receiver` has no active session.
#[must_use]
pub fn unreachable_text(receiver: &str) -> String {
    format!("{receiver} is not connected on server")
}

/// Message type tag.
///
/// The set is closed: any other value on the wire is a protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Registration of a new client identifier (carried in `text`).
    NewClient,
    /// Addressed chat message.
    Chat,
    /// Orderly end of the sender's session.
    EndSession,
    /// Error reply from the server.
    Error,
}

impl MessageType {
    /// Returns the wire representation of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewClient => "new_client",
            Self::Chat => "chat",
            Self::EndSession => "end_session",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relay message, the only entity exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier of the originating client, or [`SERVER_ID`].
    pub sender: String,
    /// Identifier of the addressed client, or [`SERVER_ID`].
    pub receiver: String,
    /// Chat payload; for `NewClient` it carries the identifier itself.
    pub text: String,
    /// Message type tag.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Creation time, used for display only.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(
        kind: MessageType,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            text: text.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Creates the registration message a client sends right after connecting.
    #[must_use]
    pub fn new_client(client_id: &str) -> Self {
        Self::new(MessageType::NewClient, client_id, SERVER_ID, client_id)
    }

    /// Creates a chat message from `sender` to `receiver`.
    #[must_use]
    pub fn chat(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(MessageType::Chat, sender, receiver, text)
    }

    /// Creates the message a client sends to end its session.
    #[must_use]
    pub fn end_session(client_id: &str) -> Self {
        Self::new(MessageType::EndSession, client_id, SERVER_ID, END_SESSION_TEXT)
    }

    /// Creates a server-originated error reply addressed to `receiver`.
    #[must_use]
    pub fn server_error(receiver: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageType::Error, SERVER_ID, receiver, text)
    }

    /// Returns the identifier a `NewClient` message asks to register.
    ///
    /// Returns `None` for any other message type or an empty identifier.
    #[must_use]
    pub fn registration_id(&self) -> Option<&str> {
        match self.kind {
            MessageType::NewClient if !self.text.is_empty() => Some(&self.text),
            _ => None,
        }
    }

    /// Returns true if this is the server's duplicate-identity rejection.
    #[must_use]
    pub fn is_identity_taken(&self) -> bool {
        self.kind == MessageType::Error && self.text == USER_ALREADY_EXISTS
    }

    /// Formats the timestamp as `YYYY-MM-DD HH:MM:SS` for terminal output.
    #[must_use]
    pub fn display_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
