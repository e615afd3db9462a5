//! Shared state for the API handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use loghive_core::{LogCollector, SearchService};
use serde::Serialize;

use crate::config::ApiConfig;

/// Counter snapshot served by the metrics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Records accepted for queueing since startup.
    pub logs_ingested_total: u64,
    /// Records that failed to queue since startup.
    pub logs_dropped_total: u64,
    /// Search requests served since startup.
    pub searches_total: u64,
    /// Store faults masked as degraded-empty responses.
    pub search_failures_total: u64,
    /// Current depth of the ingestion queue.
    pub queue_depth: u64,
}

/// Shared state behind the API handlers.
///
/// Holds the pipeline handles plus process-local counters. Counters
/// reset on restart; the queue depth is read live from the store.
pub struct AppState {
    config: ApiConfig,
    collector: Arc<LogCollector>,
    search: Arc<SearchService>,
    started: Instant,
    ingested: AtomicU64,
    dropped: AtomicU64,
    searches: AtomicU64,
}

impl AppState {
    /// Creates state over the given pipeline handles.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        collector: Arc<LogCollector>,
        search: Arc<SearchService>,
    ) -> Self {
        Self {
            config,
            collector,
            search,
            started: Instant::now(),
            ingested: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            searches: AtomicU64::new(0),
        }
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The ingestion-side collector.
    #[must_use]
    pub fn collector(&self) -> &LogCollector {
        &self.collector
    }

    /// The query-side search service.
    #[must_use]
    pub fn search(&self) -> &SearchService {
        &self.search
    }

    /// Seconds since the server started.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Records the outcome of an ingest attempt.
    pub fn record_ingest(&self, accepted: u64, dropped: u64) {
        self.ingested.fetch_add(accepted, Ordering::Relaxed);
        self.dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    /// Records a served search request.
    pub fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshots the counters and live queue depth.
    pub async fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            logs_ingested_total: self.ingested.load(Ordering::Relaxed),
            logs_dropped_total: self.dropped.load(Ordering::Relaxed),
            searches_total: self.searches.load(Ordering::Relaxed),
            search_failures_total: self.search.failure_count(),
            queue_depth: self.collector.depth().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loghive_core::{IndexStore, MemoryIndexStore, MemoryQueueStore, QueueStore};

    fn make_state() -> AppState {
        let queue = Arc::new(MemoryQueueStore::new());
        let index = Arc::new(MemoryIndexStore::new());
        let collector = Arc::new(LogCollector::new(queue as Arc<dyn QueueStore>));
        let search = Arc::new(SearchService::new(index as Arc<dyn IndexStore>));
        AppState::new(ApiConfig::default(), collector, search)
    }

    #[tokio::test]
    async fn counters_start_at_zero() {
        let state = make_state();
        let metrics = state.metrics().await;

        assert_eq!(metrics.logs_ingested_total, 0);
        assert_eq!(metrics.logs_dropped_total, 0);
        assert_eq!(metrics.searches_total, 0);
        assert_eq!(metrics.search_failures_total, 0);
        assert_eq!(metrics.queue_depth, 0);
    }

    #[tokio::test]
    async fn counters_accumulate() {
        let state = make_state();

        state.record_ingest(3, 1);
        state.record_ingest(2, 0);
        state.record_search();

        let metrics = state.metrics().await;
        assert_eq!(metrics.logs_ingested_total, 5);
        assert_eq!(metrics.logs_dropped_total, 1);
        assert_eq!(metrics.searches_total, 1);
    }
}
