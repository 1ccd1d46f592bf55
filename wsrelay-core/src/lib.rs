//! # wsrelay Core
//!
//! Core types shared by the wsrelay server and client.
//!
//! This crate provides:
//! - The [`Message`] wire entity and its closed [`MessageType`] enum
//! - Reserved identifiers and the error texts the broker replies with
//! - JSON encoding/decoding of messages
//! - Error types for codec operations

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{decode, decode_str, encode};
pub use error::{Error, Result};
pub use message::{
    END_SESSION_TEXT, Message, MessageType, SERVER_ID, USER_ALREADY_EXISTS, unreachable_text,
};
