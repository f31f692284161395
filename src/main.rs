//! papod - chat and file relay server over line-delimited JSON.

use std::io;
use std::sync::Arc;

use papod::config::ConfigError;
use papod::{Config, Gateway, Hub};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration. An explicitly given path must load; the default
    // path may simply not exist yet.
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).map_err(|e| {
            error!(path = %path, error = %e, "failed to load config");
            e
        })?,
        None => match Config::load(DEFAULT_CONFIG_PATH) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!("no {DEFAULT_CONFIG_PATH} found, using defaults");
                Config::default()
            }
            Err(e) => {
                error!(path = DEFAULT_CONFIG_PATH, error = %e, "failed to load config");
                return Err(e.into());
            }
        },
    };

    info!(addr = %config.listen.address, "starting papod");

    let hub = Arc::new(Hub::new());
    let gateway = Gateway::bind(&config, hub).await?;
    gateway.run().await?;

    Ok(())
}
