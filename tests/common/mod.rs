//! Integration test common infrastructure.
//!
//! Provides an in-process server and a raw JSON-lines client so suites
//! can assert on complete message flows, including malformed input.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
