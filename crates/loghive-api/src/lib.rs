//! # loghive-api
//!
//! HTTP API for the Loghive log pipeline: ingestion, search, error
//! pattern analysis, health and metrics endpoints.
//!
//! This crate provides:
//!
//! - [`ApiServer`] — Axum server over shared pipeline handles
//! - [`ApiConfig`] — Bind address, store locations, drain tuning
//! - [`AppState`] — Handler state with process-local counters
//! - [`ApiError`] — Error-to-response mapping

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::ApiServer;
pub use state::{AppState, MetricsSnapshot};
