//! Query-side service: searches and error-pattern analysis with
//! degraded-empty fault handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::error;

use crate::traits::IndexStore;
use crate::types::{ErrorPattern, SearchQuery, SearchResult};

/// Default trailing window for error-pattern analysis.
pub const DEFAULT_LOOKBACK_HOURS: u32 = 24;

/// Serves searches and pattern analysis over an [`IndexStore`].
///
/// Store faults never reach callers: a failed search degrades to an
/// empty result and a failed analysis to an empty pattern list. Every
/// degraded response is logged and counted, so silent failure shows up
/// in the logs and on the failure counter even though callers see a
/// well-formed reply.
pub struct SearchService {
    index: Arc<dyn IndexStore>,
    failures: AtomicU64,
}

impl SearchService {
    /// Creates a service over the given index store handle.
    #[must_use]
    pub fn new(index: Arc<dyn IndexStore>) -> Self {
        Self {
            index,
            failures: AtomicU64::new(0),
        }
    }

    /// Runs a compound search.
    ///
    /// `took_ms` reports wall-clock time spent inside this call. On a
    /// store fault the result is empty with `total_count` 0.
    pub async fn search(&self, query: &SearchQuery) -> SearchResult {
        let started = Instant::now();
        match self.index.search(query).await {
            Ok(hits) => SearchResult {
                logs: hits.records,
                total_count: hits.total,
                took_ms: started.elapsed().as_secs_f64() * 1000.0,
            },
            Err(fault) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(%fault, "search degraded to empty result");
                SearchResult::empty()
            }
        }
    }

    /// Aggregates error patterns over the trailing `hours` window.
    ///
    /// On a store fault the list is empty.
    pub async fn error_patterns(&self, hours: u32) -> Vec<ErrorPattern> {
        match self.index.error_patterns(hours).await {
            Ok(patterns) => patterns,
            Err(fault) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(%fault, hours, "pattern analysis degraded to empty result");
                Vec::new()
            }
        }
    }

    /// Number of store faults masked as degraded-empty responses.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
