//! lexcache server entry point.
//!
//! This is the main binary that opens the offline engine and serves it as an
//! MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use lexcache_core::{EngineConfig, OfflineEngine};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = EngineConfig::load().context("failed to load configuration")?;
    let engine = OfflineEngine::open(config)
        .await
        .context("failed to open offline cache")?;

    tracing::info!("Starting lexcache server on stdio transport");

    let handler = handler::LexCacheServer::new(engine);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
