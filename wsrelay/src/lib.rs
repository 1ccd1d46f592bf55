//! # wsrelay
//!
//! A minimal message relay. Clients connect over a persistent
//! bidirectional connection, register under a chosen identifier, then
//! exchange addressed text messages through a central broker.
//!
//! ## Quick Start
//!
//! ```ignore
//! use wsrelay::prelude::*;
//!
//! let (mut server, handle) = ServerBuilder::new()
//!     .bind("0.0.0.0:3030".parse().unwrap())
//!     .build();
//!
//! server.run().await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Message type, wire constants and JSON codec
//! - [`transport`] - Connection abstraction (WebSocket, framed TCP, in-memory)
//! - [`server`] - Session registry, dispatch loop and connection handlers
//! - [`client`] - Client-side session and input parsing

pub mod prelude;

/// Message type, constants and codec.
pub mod core {
    pub use wsrelay_core::*;
}

/// Connection abstraction and transports.
pub mod transport {
    pub use wsrelay_transport::*;
}

/// Server-side engine.
pub mod server {
    pub use wsrelay_server::*;
}

/// Client-side engine.
pub mod client {
    pub use wsrelay_client::*;
}
