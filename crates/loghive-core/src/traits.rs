//! Traits for the queue and index backing stores.
//!
//! Both stores are reached over the network, so every operation is
//! asynchronous. The traits use manually boxed futures to stay
//! dyn-compatible; components receive `Arc<dyn QueueStore>` /
//! `Arc<dyn IndexStore>` handles at construction time.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::types::{BatchOutcome, ErrorPattern, LogRecord, SearchHits, SearchQuery};

/// Boxed future alias used by the store traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A FIFO queue store holding serialized records.
///
/// The oldest pushed, not-yet-popped payload is the first returned by
/// `pop_raw`. Ownership of an entry transfers to the queue on push and
/// to the consumer on pop; at most one consumer receives a given entry.
pub trait QueueStore: Send + Sync {
    /// Pushes one serialized record onto the tail of the queue.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport fault; the entry is lost.
    fn push_raw<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Pops the oldest payload, or `None` if the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport fault.
    fn pop_raw(&self) -> BoxFuture<'_, Result<Option<String>>>;

    /// Current number of queued entries.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport fault.
    fn depth(&self) -> BoxFuture<'_, Result<u64>>;
}

/// A document search engine holding all persisted records.
pub trait IndexStore: Send + Sync {
    /// Creates the index schema if it does not exist yet.
    ///
    /// Idempotent: an existing schema is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport fault.
    fn ensure_schema(&self) -> BoxFuture<'_, Result<()>>;

    /// Indexes a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the document.
    fn index_one<'a>(&'a self, record: &'a LogRecord) -> BoxFuture<'a, Result<()>>;

    /// Indexes a batch of records in one bulk operation.
    ///
    /// Item-level failures are counted in the outcome rather than
    /// failing the whole batch.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bulk operation itself fails.
    fn index_batch<'a>(&'a self, records: &'a [LogRecord]) -> BoxFuture<'a, Result<BatchOutcome>>;

    /// Runs a compound filtered search, newest first, paginated.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport fault or malformed response.
    fn search<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<SearchHits>>;

    /// Aggregates ERROR/CRITICAL records from the trailing `hours`
    /// window into ranked message groups.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport fault or malformed response.
    fn error_patterns(&self, hours: u32) -> BoxFuture<'_, Result<Vec<ErrorPattern>>>;
}
