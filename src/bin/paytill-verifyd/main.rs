//! paytill-verifyd entry point.

mod cli;

use clap::Parser;
use cli::Cli;
use paytill::api::{build_router, AppState};
use paytill::ledger::LedgerClient;
use paytill::verify::{LedgerVerifier, Verifier};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let listen = cli.listen;
    let config = cli.into_config()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("paytill-verifyd v{}", env!("CARGO_PKG_VERSION"));
    info!("Verifying against ledger at {}", config.endpoint);

    let verifier: Arc<dyn Verifier> =
        Arc::new(LedgerVerifier::new(LedgerClient::new(config.endpoint)));
    let app = build_router(AppState { verifier });

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Gateway listening on {listen}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        return;
    }
    info!("Ctrl-C received, shutting down");
}
