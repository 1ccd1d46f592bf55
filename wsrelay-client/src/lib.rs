//! # wsrelay Client
//!
//! Client-side engine for the relay.
//!
//! This crate provides:
//! - Client builder with configuration options
//! - The registration / chat / end-of-session exchange with the server
//! - Parsing of `to:<receiverId> <message text>` input lines

pub mod builder;
pub mod error;
pub mod input;

pub use builder::{Client, ClientBuilder, ClientCommand, ClientEvent, ClientHandle};
pub use error::ClientError;
pub use input::{InputError, Outgoing, parse_input};
