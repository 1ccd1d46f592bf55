//! Prelude module for convenient imports.
//!
//! ```ignore
//! use wsrelay::prelude::*;
//! ```

// Core types
pub use wsrelay_core::{Error as CoreError, Message, MessageType, Result as CoreResult};
pub use wsrelay_core::{SERVER_ID, USER_ALREADY_EXISTS};

// Transport types
pub use wsrelay_transport::{Connection, Listener, TransportError, TransportKind};

// Server types
pub use wsrelay_server::{
    RelayContext, Server, ServerBuilder, ServerCommand, ServerEvent, ServerHandle, SessionRegistry,
};

// Client types
pub use wsrelay_client::{
    Client, ClientBuilder, ClientCommand, ClientError, ClientEvent, ClientHandle, parse_input,
};
