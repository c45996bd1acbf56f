//! ephone-sw entry point.
//!
//! Boots the offline cache worker over a SQLite store and exposes its events
//! as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use ephone_client::{FetchConfig, HttpFetcher};
use ephone_core::{AppConfig, CacheDb};
use ephone_worker::{RecordingHost, ServiceWorker};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    tracing::info!(
        origin = %config.origin,
        version = %config.cache_version,
        db_path = %config.db_path.display(),
        "Starting ephone-sw on stdio transport"
    );

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database at {}", config.db_path.display()))?;
    let fetcher = HttpFetcher::new(FetchConfig::from_app(&config))?;
    let host = Arc::new(RecordingHost::new());
    let worker = ServiceWorker::new(&config, Arc::new(db.clone()), Arc::new(fetcher), host.clone())?;

    let handler = handler::EphoneSwServer::new(Arc::new(worker), db, host, config.notification.title.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
