//! Relay server with graceful shutdown

use axum::Router;
use relay_queue::{DeliveryQueue, HttpDeliverer, JsonFileStore, QueueConfig, QueueProcessor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::guard::{ApiKeyGuard, INSECURE_DEFAULT_KEY};
use crate::middleware::{body_limit_layer, timeout_layer};
use crate::routes::api_router;
use crate::state::AppState;
use crate::status::{LoggingStatusHandler, StatusUpdateHandler};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Inbound request timeout
    pub request_timeout: Duration,
    /// Max request body size (bytes)
    pub max_body_size: usize,
    /// Where the pending queue is persisted
    pub queue_file: PathBuf,
    /// Shared secret for inbound callbacks
    pub inbound_api_key: String,
    /// Delivery and retry settings
    pub queue: QueueConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
            queue_file: PathBuf::from("data/webhook_queue.json"),
            inbound_api_key: INSECURE_DEFAULT_KEY.to_string(),
            queue: QueueConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("RELAY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let timeout_secs: u64 = std::env::var("RELAY_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(30);

        let queue_file = std::env::var("RELAY_QUEUE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/webhook_queue.json"));

        let inbound_api_key = match std::env::var("RELAY_INBOUND_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                tracing::warn!(
                    "RELAY_INBOUND_API_KEY is not set! Falling back to the documented insecure default key. \
                     Inbound callbacks are effectively unauthenticated until it is configured."
                );
                INSECURE_DEFAULT_KEY.to_string()
            }
        };

        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            request_timeout: Duration::from_secs(timeout_secs),
            queue_file,
            inbound_api_key,
            queue: QueueConfig::from_env(),
            ..Default::default()
        }
    }
}

/// Relay API server plus its background queue processor
pub struct RelayServer {
    config: ServerConfig,
    app_state: AppState,
    processor: QueueProcessor,
}

impl RelayServer {
    /// Load the persisted queue and wire up delivery
    pub async fn new(config: ServerConfig) -> Result<Self, ApiError> {
        Self::with_status_handler(config, Arc::new(LoggingStatusHandler)).await
    }

    /// Same as [`RelayServer::new`] with a custom status-update collaborator
    pub async fn with_status_handler(
        config: ServerConfig,
        status_handler: Arc<dyn StatusUpdateHandler>,
    ) -> Result<Self, ApiError> {
        tracing::info!(path = %config.queue_file.display(), "Opening webhook queue");
        let store = Arc::new(JsonFileStore::new(&config.queue_file));
        let queue = Arc::new(DeliveryQueue::load(store).await);

        let deliverer = Arc::new(HttpDeliverer::new(config.queue.delivery_timeout)?);
        let processor = QueueProcessor::new(queue.clone(), deliverer, config.queue.retry_policy());

        let guard = ApiKeyGuard::new(&config.inbound_api_key);
        let app_state = AppState::new(queue, guard, status_handler);

        Ok(Self {
            config,
            app_state,
            processor,
        })
    }

    /// Queue handle for in-process collaborators
    pub fn queue(&self) -> Arc<DeliveryQueue> {
        self.app_state.queue()
    }

    /// Get the configured router
    pub fn router(&self) -> Router {
        api_router(self.app_state.clone())
            .layer(body_limit_layer(self.config.max_body_size))
            .layer(timeout_layer(self.config.request_timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// Run until Ctrl+C / SIGTERM.
    ///
    /// Pending jobs stay on disk and are resumed by the next start.
    pub async fn run(self) -> Result<(), ApiError> {
        let app = self.router();
        let addr = self.config.addr;
        let queue = self.app_state.queue();

        let processor = self.processor.spawn();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Relay API listening on http://{}", addr);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Internal(format!("Server error: {}", e)));

        processor.abort();
        tracing::info!(pending = queue.len().await, "Server shutdown complete");
        served
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Initialize tracing subscriber
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,relay_queue=debug,relay_api=debug,tower_http=debug")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
