//! papod - a line-delimited JSON chat and file relay server.
//!
//! Clients connect over TCP, claim a name with a `join` message, and then
//! exchange public chat, private messages, group messages, and relayed
//! file transfers. Every message is one JSON object per line; the wire
//! types live in the `papo-proto` crate.
//!
//! The server is a library plus a thin binary so integration tests can
//! spin up a real [`Gateway`] on an ephemeral port inside the test
//! process.

pub mod config;
pub mod error;
pub mod network;
pub mod router;
pub mod state;

pub use config::Config;
pub use network::Gateway;
pub use state::Hub;
