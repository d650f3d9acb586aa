//! paytill CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, TillCommand};
use paytill::address::Address;
use paytill::config::{TillConfig, VerifyVia};
use paytill::event::SessionEvent;
use paytill::instruction::PaymentUri;
use paytill::ledger::LedgerClient;
use paytill::request::PaymentRequest;
use paytill::session::{PollSession, SessionConfig, SessionState};
use paytill::verify::{GatewayVerifier, LedgerVerifier, Verifier};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = cli.to_config()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("paytill v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        TillCommand::Init { path } => init_config(&config, path),
        TillCommand::Charge {
            amount,
            recipient,
            memo,
            label,
            message,
            svg,
        } => {
            let recipient = resolve_recipient(recipient.as_deref(), &config)?;
            let request = PaymentRequest::new(recipient, amount, memo)?;
            let uri = presentation(
                &request,
                label.or_else(|| config.label.clone()),
                message,
            )?;

            present(&uri, &request, svg.as_deref())?;

            let verifier = build_verifier(&config);
            let session = PollSession::new(request, verifier, SessionConfig::from(&config));
            run_checkout(session).await
        }
    }
}

fn init_config(config: &TillConfig, path: Option<PathBuf>) -> color_eyre::Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from("paytill.toml"));
    config.to_file(&path)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn resolve_recipient(flag: Option<&str>, config: &TillConfig) -> color_eyre::Result<Address> {
    let text = flag.or(config.recipient.as_deref()).ok_or_else(|| {
        color_eyre::eyre::eyre!("No recipient account. Use --recipient or set one in the config file.")
    })?;
    Ok(text.parse()?)
}

fn presentation(
    request: &PaymentRequest,
    label: Option<String>,
    message: Option<String>,
) -> paytill::Result<PaymentUri> {
    let mut uri = PaymentUri::encode(request)?;
    if let Some(label) = label {
        uri = uri.with_label(label);
    }
    if let Some(message) = message {
        uri = uri.with_message(message);
    }
    Ok(uri)
}

fn present(uri: &PaymentUri, request: &PaymentRequest, svg_out: Option<&Path>) -> color_eyre::Result<()> {
    println!("{}", uri.qr_unicode()?);
    println!("  {uri}");
    println!("  reference: {}", request.reference);
    println!();

    if let Some(path) = svg_out {
        std::fs::write(path, uri.qr_svg()?)?;
        info!("Payment code written to {}", path.display());
    }
    Ok(())
}

fn build_verifier(config: &TillConfig) -> Arc<dyn Verifier> {
    match config.verify_via {
        VerifyVia::Ledger => Arc::new(LedgerVerifier::new(LedgerClient::new(
            config.endpoint.clone(),
        ))),
        VerifyVia::Gateway => Arc::new(GatewayVerifier::new(config.endpoint.clone())),
    }
}

async fn run_checkout(session: PollSession) -> color_eyre::Result<()> {
    let handle = session.cancel_handle();
    let mut events = session.subscribe_events();
    let runner = tokio::spawn(session.run());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, cancelling checkout");
                handle.cancel();
            }
            event = events.recv() => match event {
                Ok(SessionEvent::AwaitingPayment { checks: 0 }) => {
                    println!("waiting for payment...");
                }
                Ok(SessionEvent::AwaitingPayment { checks }) => {
                    println!("still waiting ({checks} checks so far)");
                }
                Ok(_) | Err(_) => break,
            }
        }
    }

    match runner.await? {
        SessionState::Verified { signature } => {
            println!("payment confirmed: {signature}");
            Ok(())
        }
        SessionState::Rejected { signature } => Err(color_eyre::eyre::eyre!(
            "Payment rejected: transaction {signature} does not match the request"
        )),
        SessionState::TimedOut => Err(color_eyre::eyre::eyre!("Timed out waiting for payment")),
        SessionState::Cancelled => Err(color_eyre::eyre::eyre!("Checkout cancelled")),
        SessionState::AwaitingPayment => Err(color_eyre::eyre::eyre!(
            "Session ended while still waiting"
        )),
    }
}
