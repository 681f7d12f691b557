//! Warfront Game Server
//!
//! Authoritative server binary. Binds the WebSocket listener and runs
//! until interrupted.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warfront::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    info!("Warfront Server v{}", VERSION);
    info!("Binding {}", config.bind_addr);

    let server = GameServer::new(config);
    server.run().await.context("server terminated")?;

    Ok(())
}
