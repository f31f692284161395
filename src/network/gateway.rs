//! Gateway - TCP listener and connection acceptor.
//!
//! The gateway owns the listening socket. Every accepted stream gets a
//! fresh connection id and a dedicated task running a [`Connection`];
//! accept errors are logged and the loop keeps going.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::network::Connection;
use crate::router::Router;
use crate::state::Hub;

/// Accepts TCP connections and spawns a task per client.
pub struct Gateway {
    listener: TcpListener,
    hub: Arc<Hub>,
    router: Arc<Router>,
    max_line_bytes: usize,
}

impl Gateway {
    /// Binds the listening socket and prepares the shared router.
    pub async fn bind(config: &Config, hub: Arc<Hub>) -> anyhow::Result<Self> {
        let address = config.listen.address;
        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("failed to bind {address}"))?;
        info!(addr = %listener.local_addr()?, "listener bound");

        let router = Arc::new(Router::new(hub.clone()));
        Ok(Self {
            listener,
            hub,
            router,
            max_line_bytes: config.limits.max_line_bytes,
        })
    }

    /// The bound address. Useful when binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Runs until the process is stopped.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let conn = self.hub.next_id();
                    info!(%conn, %addr, "connection accepted");
                    let connection = Connection::new(
                        conn,
                        stream,
                        addr,
                        self.hub.clone(),
                        self.router.clone(),
                        self.max_line_bytes,
                    );
                    tokio::spawn(async move {
                        if let Err(error) = connection.run().await {
                            debug!(%conn, %error, "connection ended with error");
                        }
                    });
                }
                Err(error) => {
                    error!(%error, "failed to accept connection");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_to_ephemeral_port() {
        let mut config = Config::default();
        config.listen.address = "127.0.0.1:0".parse().unwrap();

        let hub = Arc::new(Hub::new());
        let gateway = Gateway::bind(&config, hub).await.unwrap();
        assert_ne!(gateway.local_addr().unwrap().port(), 0);
    }
}
