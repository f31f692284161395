//! JSON message codec: one [`Message`] per line.
//!
//! Wraps [`LineCodec`]: each decoded line is parsed with serde_json, each
//! encoded message is serialized and newline-terminated. Blank lines are
//! skipped rather than reported, so keep-alive newlines are harmless.
//!
//! Undecodable input (bad JSON, bad UTF-8, an oversized line) is yielded
//! as [`Frame::Invalid`] instead of a stream error. `Framed` treats a
//! decode error as terminal, and a peer sending one broken line must not
//! kill the session, so recoverable problems travel as items and only io
//! failures surface through the error channel.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, Result};
use crate::line::LineCodec;
use crate::message::Message;

/// One decoded frame.
#[derive(Debug)]
pub enum Frame {
    /// A well-formed message.
    Message(Message),
    /// A line that could not be decoded. The codec has already skipped
    /// past it; the connection decides how to answer.
    Invalid(ProtocolError),
}

/// Codec turning a byte stream into [`Frame`] values and back.
pub struct JsonCodec {
    inner: LineCodec,
}

impl JsonCodec {
    /// Create a codec with the default line-length cap.
    pub fn new() -> Self {
        Self {
            inner: LineCodec::new(),
        }
    }

    /// Create a codec with a custom line-length cap in bytes.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: LineCodec::with_max_length(max_length),
        }
    }

    /// The configured line-length cap.
    pub fn max_length(&self) -> usize {
        self.inner.max_length()
    }

    fn parse(line: &str) -> Option<Frame> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(match serde_json::from_str(line) {
            Ok(msg) => Frame::Message(msg),
            Err(err) => Frame::Invalid(ProtocolError::Json(err)),
        })
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JsonCodec {
    type Item = Frame;
    type Error = crate::error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            match self.inner.decode(src) {
                Ok(Some(line)) => match Self::parse(&line) {
                    Some(frame) => return Ok(Some(frame)),
                    None => continue,
                },
                Ok(None) => return Ok(None),
                Err(err @ (ProtocolError::LineTooLong { .. } | ProtocolError::InvalidUtf8(_))) => {
                    return Ok(Some(Frame::Invalid(err)));
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            match self.inner.decode_eof(src) {
                Ok(Some(line)) => match Self::parse(&line) {
                    Some(frame) => return Ok(Some(frame)),
                    None => continue,
                },
                Ok(None) => return Ok(None),
                Err(err @ (ProtocolError::LineTooLong { .. } | ProtocolError::InvalidUtf8(_))) => {
                    return Ok(Some(Frame::Invalid(err)));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Encoder<&Message> for JsonCodec {
    type Error = crate::error::ProtocolError;

    fn encode(&mut self, msg: &Message, dst: &mut BytesMut) -> Result<()> {
        let line = serde_json::to_string(msg)?;
        self.inner.encode(line.as_str(), dst)
    }
}

impl Encoder<Message> for JsonCodec {
    type Error = crate::error::ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<()> {
        self.encode(&msg, dst)
    }
}
