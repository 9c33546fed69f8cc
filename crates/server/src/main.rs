//! keepsake server entry point.
//!
//! Loads configuration, opens the cache, runs install and activation, then
//! serves the engine as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use keepsake_client::{CacheEngine, FetchConfig, HttpFetcher};
use keepsake_core::AppConfig;
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

    let config = AppConfig::load()?;
    let fetcher = HttpFetcher::new(FetchConfig::from_app_config(&config)?)?;
    let engine = CacheEngine::new(config, Arc::new(fetcher)).await?;

    let report = engine.start().await?;
    tracing::info!(
        version = %report.install.version,
        cached = report.install.cached.len(),
        failed = report.install.failed.len(),
        activated = report.activation.is_some(),
        "Starting keepsake server on stdio transport"
    );

    let handler = handler::KeepsakeServer::new(engine);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
