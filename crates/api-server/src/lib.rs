//! REST API server for document text extraction
//!
//! One request-response operation: upload a PDF or raster image, get back
//! the recognized text annotated by page. The recognition engine and the
//! inference device are fixed at startup and shared read-only across all
//! requests.

mod error;
mod handlers;
mod types;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use doc_extract_common::Device;
use doc_extract_orchestrator::Orchestrator;

pub use error::ApiError;
pub use types::{ErrorResponse, StatusResponse};

/// Upload size cap: a 300 dpi scan of a long document is tens of megabytes
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// API server state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    /// Orchestrator holding the shared engine handle
    pub orchestrator: Arc<Orchestrator>,
    /// Inference device selected at startup
    pub device: Device,
}

impl ApiState {
    /// Create new API state
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, device: Device) -> Self {
        Self {
            orchestrator,
            device,
        }
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        // Status check
        .route("/", get(handlers::status))
        // Document text extraction
        .route("/ocr", post(handlers::extract_text))
        // Middleware
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
pub async fn start_server(addr: &str, state: ApiState) -> Result<(), std::io::Error> {
    tracing::info!("Starting API server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await
}
