//! Relay Server - standalone entry point
//!
//! Thin wrapper around `relay-api`: reads configuration from the environment,
//! restores the persisted webhook queue and serves until shutdown.

use anyhow::Result;
use relay_api::{RelayServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    relay_api::server::init_tracing();

    tracing::info!("Starting relay server...");

    // Railway/Heroku style platforms hand us $PORT
    if let Ok(port) = std::env::var("PORT") {
        if std::env::var("RELAY_PORT").is_err() {
            tracing::info!("Mapping PORT {} to RELAY_PORT", port);
            std::env::set_var("RELAY_PORT", port);
        }
    }

    let config = ServerConfig::from_env();
    tracing::info!(
        max_retries = config.queue.max_retries,
        retry_delay_ms = (config.queue.retry_delay.as_millis() as u64),
        delivery_timeout_ms = (config.queue.delivery_timeout.as_millis() as u64),
        "Delivery settings"
    );

    let server = RelayServer::new(config).await.map_err(|e| {
        tracing::error!("Failed to initialize server: {}", e);
        e
    })?;

    server.run().await.map_err(|e| {
        tracing::error!("Server error during execution: {}", e);
        e
    })?;

    Ok(())
}
