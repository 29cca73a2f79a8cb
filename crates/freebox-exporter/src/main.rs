//! freebox-exporter - polls the Freebox local API on a fixed interval.
//!
//! The first run pairs the exporter with the box (approve it on the front
//! panel, then grant the settings permission in Freebox OS and press enter).
//! Later runs reuse the stored app token.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freebox_core::auth::StdinConfirmation;
use freebox_core::{ApiClient, Config, CredentialStore, Poller, SessionManager};

/// Initialize the tracing subscriber for logging
fn init_tracing(debug: bool) {
    // RUST_LOG wins; otherwise DEBUG picks the default level
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.debug);
    info!(
        endpoint = %config.endpoints.base(),
        token_path = %config.token_path.display(),
        fiber = config.fiber,
        "freebox-exporter starting"
    );

    let cancel = CancellationToken::new();
    let http = ApiClient::http_client(config.request_timeout)
        .context("Failed to build HTTP client")?;
    let store = Arc::new(CredentialStore::new(config.token_path.clone()));
    let session = SessionManager::new(
        http.clone(),
        config.endpoints.clone(),
        config.identity.clone(),
        store,
        Arc::new(StdinConfirmation),
    )
    .with_cancellation(cancel.clone());

    let client = ApiClient::new(http, Arc::new(session));
    let poller = Poller::new(client, config.poll_interval, config.fiber);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    if let Err(e) = poller.run(cancel).await {
        error!(error = %e, "Polling stopped");
        return Err(e).context("Freebox authentication needs operator attention");
    }

    info!("freebox-exporter shutting down");
    Ok(())
}
