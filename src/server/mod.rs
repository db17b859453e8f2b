//! Single-page web UI.
//!
//! ```text
//! GET  /             upload form
//! POST /analyze      multipart `file` → result page (HTML)
//! POST /api/analyze  multipart `file` → AnalysisReport (JSON)
//! GET  /health       {status, version}
//! ```
//!
//! Requests share nothing but the immutable [`AnalysisConfig`] and its client
//! handle; no upload or report outlives its request.

pub mod error;
pub mod routes;
pub mod views;

pub use error::{ApiError, ApiResult, PageError};

use crate::analyze::resolve_client;
use crate::config::AnalysisConfig;
use crate::error::AnalystError;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Default request body limit: 64 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Where and how the web UI listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AnalysisConfig>,
}

impl AppState {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/analyze", post(routes::analyze_page))
        .route("/api/analyze", post(routes::analyze_json))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the LLM client once, then serve until `shutdown` resolves.
///
/// A missing provider fails here, before the port is bound.
pub async fn serve<F>(
    mut config: AnalysisConfig,
    server: ServerConfig,
    shutdown: F,
) -> Result<(), AnalystError>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.client = Some(resolve_client(&config)?);

    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .map_err(|e| AnalystError::InvalidConfig(format!("bad listen address: {e}")))?;

    let app = router(AppState::new(config), server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AnalystError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!("PDF Analyst listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AnalystError::Internal(format!("server error: {e}")))?;

    info!("Server stopped cleanly");
    Ok(())
}
