//! # papo-proto
//!
//! Wire protocol for the papod chat relay: newline-delimited JSON messages
//! over a byte stream.
//!
//! ## Features
//!
//! - [`Message`]: serde-tagged enum covering the full message catalogue
//! - [`LineCodec`] / [`JsonCodec`]: tokio codecs with a line-length cap and
//!   per-line error recovery
//! - [`Transport`]: framed message stream for servers and clients
//! - Tokio integration is behind the `tokio` feature (on by default); with it
//!   disabled the crate is just the message types
//!
//! ## Quick start
//!
//! ```rust
//! use papo_proto::Message;
//!
//! let joined: Message = serde_json::from_str(r#"{"type":"join","name":"alice"}"#)?;
//! assert_eq!(
//!     joined,
//!     Message::Join {
//!         name: Some("alice".into())
//!     }
//! );
//! # Ok::<(), serde_json::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
#[cfg(feature = "tokio")]
pub mod json;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::error::{ProtocolError, Result};
#[cfg(feature = "tokio")]
pub use self::json::{Frame, JsonCodec};
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::message::Message;
#[cfg(feature = "tokio")]
pub use self::transport::Transport;
