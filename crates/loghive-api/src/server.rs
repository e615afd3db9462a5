//! API server implementation.

use std::sync::Arc;

use loghive_core::{LogCollector, SearchService};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP server for the log pipeline API.
///
/// Serves ingestion, search, pattern analysis, health and metrics
/// endpoints over shared pipeline handles.
#[derive(Clone)]
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server over the given pipeline handles.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        collector: Arc<LogCollector>,
        search: Arc<SearchService>,
    ) -> Self {
        let state = Arc::new(AppState::new(config, collector, search));
        Self { state }
    }

    /// The shared handler state, for external access.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Starts the server and listens for connections.
    ///
    /// Runs until the server encounters a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the configured address fails.
    pub async fn serve(&self) -> ApiResult<()> {
        let addr = self.state.config().bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::BindFailed(addr, e))?;

        info!(addr = %addr, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    /// Starts the server with graceful shutdown support.
    ///
    /// The server shuts down when the provided future completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the configured address fails.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> ApiResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config().bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::BindFailed(addr, e))?;

        info!(addr = %addr, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        info!("API server shut down");
        Ok(())
    }

    /// Creates the router without starting the server.
    ///
    /// Useful for testing or embedding in another server.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }
}
