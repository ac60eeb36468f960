//! Assistant Relay server
//!
//! Entry point for the chat and shoe generation relay.

use std::sync::Arc;

use assistant_relay::{config::AppConfig, server, telemetry};
use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing::info;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => Arc::new(c),
        Err(msg) => {
            eprintln!("Configuration error: {msg}");
            std::process::exit(1);
        }
    };

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(&config.logging);

    info!(
        name: "app.starting",
        version = env!("CARGO_PKG_VERSION"),
        log_format = config.logging.format.as_str(),
        "Starting assistant relay"
    );

    server::start_server(config).await
}
