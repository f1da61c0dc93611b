//! netfirst server entry point.
//!
//! Loads configuration, registers the worker (restoring it when this version
//! is already installed, installing it otherwise) and then serves MCP on
//! stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use netfirst_client::{FetchClient, FetchConfig};
use netfirst_core::config::AppConfig;
use netfirst_core::{CacheDb, Registration, ServiceWorker, WorkerState};
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

    let config = AppConfig::load()?;
    tracing::info!(
        db_path = %config.db_path.display(),
        generation = %config.generation(),
        scope = %config.scope,
        "Starting netfirst server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let worker = ServiceWorker::new(db, Arc::new(fetcher), config.worker_config()?);
    let registration = Arc::new(Registration::restore(worker).await?);

    // A failed install leaves the worker redundant; requests still reach the network.
    if registration.state().await == WorkerState::Parsed
        && let Err(e) = registration.install().await
    {
        tracing::warn!(error = %e, "install failed, serving without offline cache");
    }

    let handler = handler::NetfirstServer::new(registration);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
