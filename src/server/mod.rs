//! HTTP surface: routes, shared state and error mapping.

pub mod error;
pub mod handlers;

use crate::convert::Converter;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub converter: Arc<Converter>,
    /// Per-file upload ceiling checked while the multipart body streams in.
    /// `None` falls back to the converter's `max_file_size`.
    pub max_upload_bytes: Option<u64>,
}

impl AppState {
    pub fn new(converter: Converter) -> Self {
        Self {
            converter: Arc::new(converter),
            max_upload_bytes: None,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Bytes buffered per upload before it is rejected: the explicit ceiling
    /// when set, otherwise the converter's `max_file_size`.
    pub fn upload_limit(&self) -> u64 {
        self.max_upload_bytes
            .unwrap_or(self.converter.config().max_file_size)
    }
}

/// Creates the router with all routes configured
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/convert", post(handlers::convert_single))
        .route("/api/convert", post(handlers::convert_batch))
        // Size policy is enforced per field while the multipart body streams.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Prints all available routes for logging
pub fn print_routes() {
    tracing::info!("Available routes:");
    tracing::info!("  GET  /health       - Liveness and version");
    tracing::info!("  POST /convert      - Convert one file (field `file`)");
    tracing::info!("  POST /api/convert  - Convert every uploaded file");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConversionConfig;

    fn state(max_file_size: u64) -> AppState {
        let config = ConversionConfig::builder()
            .max_file_size(max_file_size)
            .build()
            .unwrap();
        AppState::new(Converter::new(config))
    }

    #[test]
    fn upload_limit_defaults_to_max_file_size() {
        assert_eq!(state(100).upload_limit(), 100);
        assert_eq!(state(100).with_max_upload_bytes(Some(32)).upload_limit(), 32);
        assert_eq!(state(100).with_max_upload_bytes(Some(500)).upload_limit(), 500);
    }
}
