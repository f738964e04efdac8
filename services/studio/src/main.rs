use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod middleware;
mod models;
mod routes;
mod state;

use common::{
    capability::{ApiKeyStore, CapabilityGate},
    genai::GenAiClient,
    ledger::CreditLedger,
    orchestrator::JobOrchestrator,
    script::ScriptAssist,
    session::StudioSession,
    settings::StudioConfig,
};
use tokio::net::TcpListener;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting studio service");

    let config = StudioConfig::from_env()?;

    // The key store is shared so a newly selected key reaches the client
    let keys = ApiKeyStore::from_env();
    let client = Arc::new(GenAiClient::new(config.genai_config(), keys.clone())?);

    let capability = CapabilityGate::new(Arc::new(keys), config.retry_policy());
    if !capability.is_usable().await {
        warn!("No API key configured; generation stays disabled until one is selected");
    }

    let session = StudioSession::new(
        CreditLedger::new(config.initial_credits),
        JobOrchestrator::new(client.clone(), config.poll_policy()),
        capability,
        ScriptAssist::new(client),
    );

    info!(
        model = %config.video_model,
        poll_interval_secs = config.poll_interval_secs,
        max_wait_secs = config.max_wait_secs,
        "Studio service initialized successfully"
    );

    let app = routes::create_router(AppState { session });

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Studio service listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tokio::signal::ctrl_c()))
        .await?;

    Ok(())
}

/// Resolve once `signal` fires; a failed handler still lets the service stop
async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down studio service");
}
