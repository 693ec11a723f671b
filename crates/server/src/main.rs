// crates/server/src/main.rs
//! Headway server binary.
//!
//! Loads secrets, starts the maintenance tasks, then serves the API until
//! Ctrl-C. On shutdown the maintenance tasks are cancelled and awaited.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use headway_core::SystemClock;
use headway_server::notify::{LogNotifier, Notifier, WebhookNotifier};
use headway_server::secrets::SecretRegistry;
use headway_server::{create_app, maintenance, AppState, Config};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,headway_server=info,headway_core=info".into()),
        )
        .init();

    let config = Config::parse();

    let secrets = SecretRegistry::load_dir(&config.secrets_dir)
        .with_context(|| format!("loading secrets from {}", config.secrets_dir.display()))?;

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook {
        Some(url) => {
            info!(url = %url, "Forwarding messages to webhook");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => Arc::new(LogNotifier),
    };

    let state = AppState::with_parts(secrets, Arc::new(SystemClock), notifier, config.overshoot);

    let cancel = CancellationToken::new();
    let maintenance = maintenance::start(state.clone(), config.maintenance(), cancel.clone());

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(addr = %config.bind, overshoot = %config.overshoot, "Headway server listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Cannot listen for Ctrl-C, shutting down");
            }
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    maintenance.join().await;
    info!("Headway server stopped");
    Ok(())
}
