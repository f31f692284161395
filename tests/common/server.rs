//! Test server management.
//!
//! Runs an in-process papod gateway on an ephemeral port. Integration
//! tests get a real TCP listener without touching a fixed port or a
//! child process.

use std::net::SocketAddr;
use std::sync::Arc;

use papod::{Config, Gateway, Hub};
use tokio::task::JoinHandle;

use super::client::TestClient;

/// A test server instance.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Binds a fresh server on port 0 and starts its accept loop.
    pub async fn spawn() -> anyhow::Result<Self> {
        let mut config = Config::default();
        config.listen.address = "127.0.0.1:0".parse()?;

        let hub = Arc::new(Hub::new());
        let gateway = Gateway::bind(&config, hub).await?;
        let addr = gateway.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = gateway.run().await;
        });

        Ok(Self { addr, handle })
    }

    /// The server address.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self, name: &str) -> anyhow::Result<TestClient> {
        TestClient::connect(&self.address(), name).await
    }

    /// Connect and complete the join handshake.
    #[allow(dead_code)]
    pub async fn join(&self, name: &str) -> anyhow::Result<TestClient> {
        let mut client = self.connect(name).await?;
        client.join().await?;
        Ok(client)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
