//! TCP transport module.
//!
//! Provides a framed TCP listener and client carrying one JSON message per
//! length-prefixed frame.

pub mod client;
pub mod framing;
pub mod server;

pub use client::{TcpClientConfig, connect};
pub use framing::JsonFrameCodec;
pub use server::{TcpConnection, TcpServer, TcpServerConfig};
