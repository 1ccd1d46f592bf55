//! Message framing codec for TCP.
//!
//! Provides length-prefixed framing for JSON-encoded relay messages.

use crate::error::TransportError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use wsrelay_core::Message;

/// Default maximum frame size (64 KiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Length-prefixed JSON codec.
///
/// Frame format: `[4-byte length (little-endian)][JSON message]`
pub struct JsonFrameCodec {
    max_frame_size: usize,
}

impl JsonFrameCodec {
    /// Creates a new frame codec with the specified maximum frame size.
    ///
    /// # Arguments
    /// * `max_frame_size` - Maximum allowed frame size in bytes
    #[must_use]
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for JsonFrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for JsonFrameCodec {
    type Item = Message;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }

        let length = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > self.max_frame_size {
            return Err(TransportError::frame_too_large(length, self.max_frame_size));
        }

        if src.len() < 4 + length {
            src.reserve(4 + length - src.len());
            return Ok(None);
        }

        src.advance(4);
        let frame = src.split_to(length);
        Ok(Some(wsrelay_core::decode(&frame)?))
    }
}

impl Encoder<&Message> for JsonFrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = wsrelay_core::encode(item)?;

        if json.len() > self.max_frame_size {
            return Err(TransportError::frame_too_large(
                json.len(),
                self.max_frame_size,
            ));
        }

        dst.reserve(4 + json.len());
        dst.put_u32_le(json.len() as u32);
        dst.put_slice(json.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(payload);
        buf
    }

    #[test]
    fn test_encode_writes_length_prefix() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::new();
        let msg = Message::chat("alice", "bob", "hello");

        codec.encode(&msg, &mut buf).unwrap();

        let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(len, buf.len() - 4);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), msg);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame() {
        let mut codec = JsonFrameCodec::default();
        let json = wsrelay_core::encode(&Message::new_client("alice")).unwrap();
        let full = frame(json.as_bytes());

        let mut buf = BytesMut::from(&full[..2]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[2..10]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[10..]);
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.registration_id(), Some("alice"));
    }

    #[test]
    fn test_frame_too_large() {
        let mut codec = JsonFrameCodec::new(100);
        let mut buf = BytesMut::new();
        buf.put_u32_le(200);

        let result = codec.decode(&mut buf);
        assert!(matches!(
            result,
            Err(TransportError::FrameTooLarge { size: 200, max: 100 })
        ));
    }

    #[test]
    fn test_encode_too_large() {
        let mut codec = JsonFrameCodec::new(16);
        let mut buf = BytesMut::new();

        let result = codec.encode(&Message::chat("alice", "bob", "hello"), &mut buf);
        assert!(result.is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_unknown_type_is_protocol_error() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = frame(
            br#"{"sender":"a","receiver":"b","text":"x","type":"shout","timestamp":"2024-01-01T00:00:00Z"}"#,
        );

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn test_multiple_frames() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::new();

        for text in ["one", "two", "three"] {
            codec.encode(&Message::chat("a", "b", text), &mut buf).unwrap();
        }

        for text in ["one", "two", "three"] {
            assert_eq!(codec.decode(&mut buf).unwrap().unwrap().text, text);
        }
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }
}
