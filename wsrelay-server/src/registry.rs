//! Session registry.
//!
//! The one piece of shared mutable state in the relay: written by every
//! connection handler (register/unregister) and read by the dispatcher.

use crate::error::{RegistryError, SendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::mpsc;
use wsrelay_core::Message;

/// Handle to a registered connection.
///
/// Messages are queued to the connection's own task, which performs the
/// actual write; delivering never blocks the caller.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    connection_id: u64,
    outbound: mpsc::UnboundedSender<Message>,
}

impl SessionHandle {
    /// Creates a handle for `connection_id` writing into `outbound`.
    #[must_use]
    pub fn new(connection_id: u64, outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            connection_id,
            outbound,
        }
    }

    /// Returns the ID of the connection this handle writes to.
    #[must_use]
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Queues a message for the connection.
    ///
    /// # Errors
    /// Returns `SendError` if the connection task has already gone away.
    pub fn deliver(&self, message: Message) -> Result<(), SendError> {
        self.outbound.send(message).map_err(|_| SendError {
            message: format!("connection {} is closed", self.connection_id),
        })
    }

    /// Returns true if the connection task has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Maps client identifiers to their live connection.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Binds `client_id` to `handle` if the identifier is free.
    ///
    /// # Errors
    /// Returns `RegistryError::AlreadyExists` and leaves the existing entry
    /// untouched if the identifier is taken.
    pub fn register(&self, client_id: &str, handle: SessionHandle) -> Result<(), RegistryError> {
        match self.sessions.write().entry(client_id.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyExists(client_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    /// Removes `client_id`. Removing an absent identifier is a no-op.
    pub fn unregister(&self, client_id: &str) -> Option<SessionHandle> {
        self.sessions.write().remove(client_id)
    }

    /// Removes `client_id` only while it is still bound to `connection_id`.
    ///
    /// Returns true if an entry was removed.
    pub fn unregister_connection(&self, client_id: &str, connection_id: u64) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get(client_id) {
            Some(handle) if handle.connection_id == connection_id => {
                sessions.remove(client_id);
                true
            }
            _ => false,
        }
    }

    /// Looks up the connection bound to `client_id`.
    ///
    /// # Errors
    /// Returns `RegistryError::NotFound` if no session is registered.
    pub fn resolve(&self, client_id: &str) -> Result<SessionHandle, RegistryError> {
        self.sessions
            .read()
            .get(client_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(client_id.to_string()))
    }

    /// Returns true if `client_id` has an active session.
    #[must_use]
    pub fn contains(&self, client_id: &str) -> bool {
        self.sessions.read().contains_key(client_id)
    }

    /// Returns the number of active sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns all registered identifiers, sorted.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
