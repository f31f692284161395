//! State management module.
//!
//! Contains the Hub (shared server state) and its components.

mod conn;
mod groups;
mod hub;
mod registry;

pub use conn::{ConnId, ConnIdGenerator};
pub use groups::GroupDirectory;
pub use hub::{Hub, OUTBOUND_QUEUE};
pub use registry::{MAX_NAME_CHARS, Registry};
