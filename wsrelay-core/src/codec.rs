//! JSON encoding of relay messages.
//!
//! Every transport frame carries exactly one JSON object with the fields
//! `sender`, `receiver`, `text`, `type` and `timestamp`.

use crate::error::{Error, Result};
use crate::message::Message;

/// Encodes a message as a JSON string.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode(message: &Message) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes a message from a UTF-8 JSON payload.
///
/// # Errors
/// Returns [`Error::InvalidUtf8`] for non UTF-8 input and
/// [`Error::InvalidMessage`] for malformed JSON, missing fields or an
/// unknown `type`.
pub fn decode(payload: &[u8]) -> Result<Message> {
    let text = std::str::from_utf8(payload).map_err(|e| Error::InvalidUtf8 {
        offset: e.valid_up_to(),
    })?;
    decode_str(text)
}

/// Decodes a message from a JSON string.
///
/// # Errors
/// Returns [`Error::InvalidMessage`] for malformed JSON, missing fields or
/// an unknown `type`.
pub fn decode_str(payload: &str) -> Result<Message> {
    Ok(serde_json::from_str(payload)?)
}
