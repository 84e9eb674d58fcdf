mod config;

use anyhow::{Context, Result};
use clap::Parser;
use confab_server::{
    AppState, MemoryDocumentStore, MemoryParticipantStore, WebRtcPeerFactory, router,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let verifier = cli.verifier()?;
    if !verifier.requires_token() {
        warn!("Running without token verification");
    }

    let state = AppState::new(
        Arc::new(MemoryParticipantStore::new()),
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(WebRtcPeerFactory::new(cli.transport_config())),
        verifier,
        cli.session_config(),
    );

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;
    info!("Confab listening on http://{}", cli.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Confab stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
