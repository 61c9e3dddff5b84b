//! bivouac server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use bivouac_client::SiteService;
use bivouac_core::AppConfig;
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
    let service = Arc::new(SiteService::open(&config).await?);

    tracing::info!(
        generation = %service.generation(),
        scope = %service.scope().url(),
        db = %config.db_path.display(),
        "Starting bivouac server on stdio transport"
    );

    // An unreachable origin should not keep the server from answering from
    // whatever generation is already active.
    if let Err(err) = service.deploy().await {
        tracing::warn!(error = %err, "startup deploy failed");
    }

    let handler = handler::BivouacServer::new(Arc::clone(&service));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    service.flush().await;

    Ok(())
}
