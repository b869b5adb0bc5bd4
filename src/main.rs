//! Cookie Sessions Server
//!
//! Entry point for the session-tracking HTTP server.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use cookie_sessions::{config::AppConfig, server, telemetry};
use dotenvy::dotenv;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init();

    let config = Arc::new(AppConfig::load()?);
    info!(
        name: "config.loaded",
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    server::start_server(config).await
}
