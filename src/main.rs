//! Document chat client
//!
//! Uploads a document to a question-answering backend and exchanges
//! messages about it from the terminal.

mod backend;
mod config;
mod repl;
mod runtime;
mod session;
mod state_machine;

use backend::{Backend, HttpBackend, LoggingBackend};
use config::ClientConfig;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (stderr, so it never interleaves with the chat)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docchat=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ClientConfig::from_env();
    tracing::info!(
        base_url = %config.base_url,
        upload_timeout_secs = config.upload_timeout.as_secs(),
        chat_timeout_secs = config.chat_timeout.as_secs(),
        "Configuration loaded"
    );

    let backend = LoggingBackend::new(Arc::new(HttpBackend::new(config.clone())?));

    // Warn early; the session still starts so the user sees errors inline
    match backend.health().await {
        Ok(health) => tracing::info!(status = %health.status, "Backend reachable"),
        Err(e) => {
            tracing::warn!(kind = ?e.kind, error = %e, "Backend health check failed");
            eprintln!("⚠️  {e}\n");
        }
    }

    let handle = runtime::start(config, backend);
    repl::run(&handle).await?;

    Ok(())
}
