//! # loghive-core
//!
//! Core pipeline for the Loghive log aggregation service: ingestion
//! queue, searchable index, query engine and error-pattern analysis.
//!
//! This crate provides:
//!
//! - [`LogRecord`] / [`LogLevel`] — Structured log records
//! - [`SearchQuery`] / [`SearchResult`] — Filtered and full-text search
//! - [`ErrorPattern`] — Aggregated error groups
//! - [`QueueStore`] / [`IndexStore`] — Backing store traits
//! - [`HttpQueueStore`] / [`HttpIndexStore`] — HTTP+JSON store clients
//! - [`MemoryQueueStore`] / [`MemoryIndexStore`] — In-process stores
//! - [`LogCollector`] — Ingestion-side queue facade
//! - [`SearchService`] — Query-side service with degraded-empty faults
//! - [`IndexWorker`] — Background queue-to-index drain loop
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use loghive_core::{
//!     IndexWorker, IndexWorkerConfig, LogCollector, LogLevel, LogRecord,
//!     MemoryIndexStore, MemoryQueueStore, SearchQuery, SearchService,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = Arc::new(MemoryQueueStore::new());
//! let index = Arc::new(MemoryIndexStore::new());
//! let collector = Arc::new(LogCollector::new(queue));
//!
//! // Ingest a record, drain it into the index, then search for it.
//! let record = LogRecord::new(LogLevel::Error, "disk full", "host-1");
//! assert!(collector.push(&record).await);
//!
//! let worker = IndexWorker::new(
//!     Arc::clone(&collector),
//!     index.clone(),
//!     IndexWorkerConfig::default(),
//! );
//! worker.drain_once().await.expect("index store is in-process");
//!
//! let service = SearchService::new(index);
//! let result = service.search(&SearchQuery::default().with_text("disk")).await;
//! assert_eq!(result.total_count, 1);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod index;
pub mod query;
pub mod queue;
pub mod traits;
pub mod types;
pub mod worker;

// Re-export main types
pub use engine::{DEFAULT_LOOKBACK_HOURS, SearchService};
pub use error::{PipelineError, Result};
pub use index::{HttpIndexStore, MemoryIndexStore};
pub use queue::{HttpQueueStore, LogCollector, MemoryQueueStore};
pub use traits::{BoxFuture, IndexStore, QueueStore};
pub use types::{
    BatchOutcome, DEFAULT_LIMIT, ErrorPattern, LogBatch, LogLevel, LogRecord, MAX_LIMIT,
    MAX_PATTERN_SERVICES, MAX_PATTERNS, SearchHits, SearchQuery, SearchResult,
};
pub use worker::{DEFAULT_BATCH_SIZE, DEFAULT_DRAIN_INTERVAL, IndexWorker, IndexWorkerConfig};
