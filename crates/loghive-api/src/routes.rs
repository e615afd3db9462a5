//! Route configuration for the log pipeline API.

use std::sync::Arc;

use axum::routing::{Router, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    get_metrics, get_patterns, health_check, ingest_batch, ingest_log, search_logs,
    search_logs_get,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(state.config());

    Router::new()
        // Ingestion
        .route("/logs/ingest", post(ingest_log))
        .route("/logs/batch", post(ingest_batch))
        // Search
        .route("/logs/search", post(search_logs).get(search_logs_get))
        // Pattern analysis
        .route("/logs/patterns", get(get_patterns))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &crate::config::ApiConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
