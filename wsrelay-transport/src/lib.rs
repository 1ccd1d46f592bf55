//! # wsrelay Transport
//!
//! Connection abstraction for the relay.
//!
//! The server and client only depend on the [`Connection`] and [`Listener`]
//! traits: a duplex channel that carries one [`Message`] per send/receive
//! call, where connection loss is observed as the end of the stream or an
//! error.
//!
//! This crate provides:
//! - [`ws`] - WebSocket transport (the default wire format)
//! - [`tcp`] - Length-prefixed JSON frames over plain TCP
//! - [`memory`] - In-process connection pairs for tests
//!
//! [`Message`]: wsrelay_core::Message

pub mod connection;
pub mod error;
pub mod memory;
#[cfg(feature = "tcp")]
pub mod tcp;
#[cfg(feature = "ws")]
pub mod ws;

pub use connection::{Accepted, Connection, Listener, TransportKind};
pub use error::TransportError;
pub use memory::MemoryConnection;
