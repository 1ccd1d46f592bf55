//! # wsrelay Server
//!
//! Server-side engine for the relay.
//!
//! This crate provides:
//! - [`SessionRegistry`] mapping client identifiers to live connections
//! - [`Dispatcher`], the single delivery path for chat messages
//! - [`ConnectionHandler`], the per-connection state machine
//! - Server builder, handle and accept loop

pub mod builder;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;

pub use builder::{Server, ServerBuilder, ServerCommand, ServerEvent, ServerHandle};
pub use context::RelayContext;
pub use dispatcher::{Delivery, Dispatcher};
pub use error::{RegistryError, SendError, ServerError};
pub use handler::{ConnectionHandler, ConnectionState, Inbound, classify};
pub use registry::{SessionHandle, SessionRegistry};
