//! Error types for the wire protocol library.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
///
/// The connection loop distinguishes recoverable decode failures (a bad line
/// was consumed, the stream can continue) from I/O errors, which end the
/// connection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line contained invalid UTF-8. The offending line has already been
    /// consumed from the read buffer.
    #[error("invalid utf-8 in line: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A line exceeded the maximum allowed length. The codec discards input
    /// through the next line boundary, so decoding can resume afterwards.
    #[error("line too long (limit: {limit} bytes)")]
    LineTooLong {
        /// Maximum allowed line length in bytes, including the terminator.
        limit: usize,
    },

    /// A line was not a valid message object.
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}
