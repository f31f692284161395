//! Line-based codec for tokio.
//!
//! Reads and writes newline-terminated UTF-8 lines. Decoded lines have their
//! terminator (`\n` or `\r\n`) stripped; encoding appends `\n`. An oversized
//! line is reported once and then discarded through the next line boundary,
//! so the stream recovers instead of erroring forever.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, Result};

/// Newline-delimited codec with a maximum line length.
pub struct LineCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
    /// Maximum line length in bytes, excluding the terminator.
    max_length: usize,
    /// True while skipping the remainder of an oversized line.
    discarding: bool,
}

impl LineCodec {
    /// Default maximum line length: 64 KiB.
    pub const DEFAULT_MAX_LENGTH: usize = 64 * 1024;

    /// Create a codec with the default length cap.
    pub fn new() -> Self {
        Self::with_max_length(Self::DEFAULT_MAX_LENGTH)
    }

    /// Create a codec with a custom length cap in bytes.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            discarding: false,
        }
    }

    /// The configured length cap.
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        loop {
            if self.discarding {
                // Still inside an oversized line: drop input through the
                // next newline, then resume normal decoding.
                match src.iter().position(|b| *b == b'\n') {
                    Some(offset) => {
                        src.advance(offset + 1);
                        self.discarding = false;
                        self.next_index = 0;
                    }
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                }
                continue;
            }

            // Scan at most one byte past the cap so an oversized line is
            // caught even before its terminator arrives.
            let read_to = usize::min(self.max_length.saturating_add(1), src.len());
            return match src[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n')
            {
                Some(offset) => {
                    let mut line = src.split_to(self.next_index + offset + 1);
                    self.next_index = 0;
                    line.truncate(line.len() - 1);
                    if line.last() == Some(&b'\r') {
                        line.truncate(line.len() - 1);
                    }
                    Ok(Some(String::from_utf8(line.to_vec())?))
                }
                None if src.len() > self.max_length => {
                    self.discarding = true;
                    self.next_index = 0;
                    Err(ProtocolError::LineTooLong {
                        limit: self.max_length,
                    })
                }
                None => {
                    // No complete line yet - remember where we stopped.
                    self.next_index = read_to;
                    Ok(None)
                }
            };
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None if src.is_empty() => Ok(None),
            None => {
                // Stream ended without a final newline: surface the tail.
                let mut line = src.split_to(src.len());
                self.next_index = 0;
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                Ok(Some(String::from_utf8(line.to_vec())?))
            }
        }
    }
}

impl Encoder<&str> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: &str, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<()> {
        self.encode(line.as_str(), dst)
    }
}
