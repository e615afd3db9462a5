//! HTTP request handlers for the log pipeline API.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use loghive_core::engine::DEFAULT_LOOKBACK_HOURS;
use loghive_core::{ErrorPattern, LogBatch, LogRecord, SearchQuery, SearchResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::{AppState, MetricsSnapshot};

/// Response to a single-record ingest.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Whether the record was accepted into the queue.
    pub success: bool,
    /// Server-assigned identifier for tracing this ingest attempt.
    pub correlation_id: Uuid,
}

/// Response to a batch ingest.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// Records accepted into the queue.
    pub queued: usize,
    /// Records submitted in the batch.
    pub total: usize,
    /// Caller-supplied batch identifier, or one assigned by the server.
    pub batch_id: String,
}

/// Query parameters for pattern analysis.
#[derive(Debug, Deserialize)]
pub struct PatternQuery {
    /// Trailing window in hours (defaults to 24).
    pub hours: Option<u32>,
}

/// Response to a pattern analysis request.
#[derive(Debug, Serialize)]
pub struct PatternsResponse {
    /// Trailing window the analysis covered.
    pub hours: u32,
    /// Ranked error groups, most frequent first.
    pub patterns: Vec<ErrorPattern>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status message.
    pub status: String,
    /// Current server time.
    pub timestamp: DateTime<Utc>,
    /// Current depth of the ingestion queue.
    pub queue_depth: u64,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
}

/// Handle POST /logs/ingest - queue a single record.
///
/// A queue fault is reported in the body as `success: false` rather
/// than as an HTTP error; the caller's record is lost either way and
/// retrying is the caller's call.
pub async fn ingest_log(
    State(state): State<Arc<AppState>>,
    Json(record): Json<LogRecord>,
) -> Json<IngestResponse> {
    let success = state.collector().push(&record).await;
    state.record_ingest(u64::from(success), u64::from(!success));

    Json(IngestResponse {
        success,
        correlation_id: Uuid::new_v4(),
    })
}

/// Handle POST /logs/batch - queue a batch of records.
///
/// Records are queued one by one; a fault on one loses only that
/// record. The response reports how many made it.
pub async fn ingest_batch(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<LogBatch>,
) -> Json<BatchResponse> {
    let total = batch.logs.len();
    let queued = state.collector().push_batch(&batch.logs).await;
    state.record_ingest(queued as u64, (total - queued) as u64);

    Json(BatchResponse {
        queued,
        total,
        batch_id: batch.batch_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
    })
}

/// Handle POST /logs/search - compound search with a JSON body.
///
/// The request is validated at the model boundary: a limit over the
/// server ceiling is rejected with 422 rather than silently clamped.
pub async fn search_logs(
    State(state): State<Arc<AppState>>,
    Json(query): Json<SearchQuery>,
) -> ApiResult<Json<SearchResult>> {
    query.validate()?;
    state.record_search();
    Ok(Json(state.search().search(&query).await))
}

/// Handle GET /logs/search - compound search via query parameters.
///
/// Unlike the POST form, an oversized limit is clamped to the server
/// ceiling instead of rejected.
pub async fn search_logs_get(
    State(state): State<Arc<AppState>>,
    Query(mut query): Query<SearchQuery>,
) -> Json<SearchResult> {
    query.limit = query.effective_limit();
    state.record_search();
    Json(state.search().search(&query).await)
}

/// Handle GET /logs/patterns - ranked error groups over a trailing window.
pub async fn get_patterns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PatternQuery>,
) -> Json<PatternsResponse> {
    let hours = params.hours.unwrap_or(DEFAULT_LOOKBACK_HOURS);
    let patterns = state.search().error_patterns(hours).await;

    Json(PatternsResponse { hours, patterns })
}

/// Handle GET /health - liveness plus queue depth.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        queue_depth: state.collector().depth().await,
        uptime_secs: state.uptime_secs(),
    })
}

/// Handle GET /metrics - process-local pipeline counters.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics().await)
}
