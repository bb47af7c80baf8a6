//! Interest Bridge API Server implementation
//!
//! HTTP REST API server using Axum. Provides `/calculate`, `/verify`,
//! `/health` and `/`.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use crate::config::{parse_origins, DEFAULT_ALLOWED_ORIGINS};
use crate::gateway::SpreadsheetGateway;

/// API Server configuration
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: parse_origins(DEFAULT_ALLOWED_ORIGINS),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub gateway: Arc<SpreadsheetGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<SpreadsheetGateway>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            gateway,
        }
    }
}

/// Install the global tracing subscriber on stderr. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interest_bridge=info,tower_http=info".into()),
        )
        .try_init();
}

/// `*` allows any origin without credentials; an explicit list allows
/// credentialed requests from exactly those origins.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the router with all endpoints and middleware.
pub fn build_router(state: Arc<AppState>, config: &ApiConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/verify", get(handlers::verify))
        .route("/calculate", post(handlers::calculate))
        .with_state(state)
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Bind the listener. `host` may be an IP literal or a resolvable hostname.
pub async fn bind_listener(config: &ApiConfig) -> anyhow::Result<TcpListener> {
    TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve_until<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Run the API server until SIGINT/SIGTERM
pub async fn run_api_server(config: ApiConfig, gateway: Arc<SpreadsheetGateway>) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(gateway));
    let app = build_router(state, &config);

    let listener = bind_listener(&config).await?;
    info!("Interest Bridge API Server starting on http://{}", listener.local_addr()?);
    info!("   Endpoints: POST /calculate, GET /verify");
    info!("   Health: /health, Info: /");
    info!("   Allowed origins: {}", config.allowed_origins.join(", "));

    serve_until(listener, app, shutdown_signal()).await?;

    info!("Interest Bridge API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
