//! HTTP server command for the product catalog
//!
//! Acquires one connection through the fallback chain and serves the
//! product API on it until shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;

use catalog_server::http::{run_server, ServerConfig};
use catalog_server::AppState;

use super::DatabaseArgs;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Address to bind to (overrides [server].bind, default: 127.0.0.1:8080)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = args.database.load_config()?;

    let mut server_config =
        ServerConfig::try_from(&config.server).context("Invalid [server] config")?;
    if let Some(bind) = args.bind {
        server_config.bind_addr = bind;
    }
    server_config.cors_permissive |= args.cors_permissive;

    let acquired = config
        .database
        .supplier()
        .acquire()
        .await
        .context("Failed to acquire a database connection")?;

    tracing::info!("Starting catalog server on {}", server_config.bind_addr);

    // Run server (blocks until shutdown)
    run_server(AppState::from_acquired(acquired), server_config)
        .await
        .context("Server error")?;

    Ok(())
}
