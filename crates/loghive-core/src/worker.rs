//! Background worker that drains the ingestion queue into the index.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::queue::LogCollector;
use crate::traits::IndexStore;
use crate::types::BatchOutcome;

/// Default number of records drained per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default pause between drain sweeps.
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_secs(1);

/// Tuning knobs for the drain loop.
#[derive(Debug, Clone)]
pub struct IndexWorkerConfig {
    /// Maximum records popped and indexed per batch.
    pub batch_size: usize,
    /// Pause between sweeps once the queue runs empty.
    pub interval: Duration,
}

impl Default for IndexWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            interval: DEFAULT_DRAIN_INTERVAL,
        }
    }
}

/// Moves records from the ingestion queue into the index store.
///
/// The worker is the only queue consumer, so queue FIFO order carries
/// through to indexing order. Records popped from the queue are gone
/// from it; an indexing fault after the pop loses that batch, which is
/// logged and counted but never retried.
pub struct IndexWorker {
    collector: Arc<LogCollector>,
    index: Arc<dyn IndexStore>,
    config: IndexWorkerConfig,
}

impl IndexWorker {
    /// Creates a worker draining `collector` into `index`.
    #[must_use]
    pub fn new(
        collector: Arc<LogCollector>,
        index: Arc<dyn IndexStore>,
        config: IndexWorkerConfig,
    ) -> Self {
        Self {
            collector,
            index,
            config,
        }
    }

    /// Pops one batch and indexes it, returning what happened.
    ///
    /// An empty queue yields an all-zero outcome. A bulk-level store
    /// fault loses the popped batch (logged, at most one batch) and is
    /// returned as an error so the caller stops sweeping instead of
    /// draining the rest of the queue into an unavailable store.
    ///
    /// # Errors
    ///
    /// Returns the store fault when the bulk operation itself fails.
    pub async fn drain_once(&self) -> Result<BatchOutcome> {
        let records = self.collector.pop(self.config.batch_size).await;
        if records.is_empty() {
            return Ok(BatchOutcome::default());
        }

        match self.index.index_batch(&records).await {
            Ok(outcome) => {
                if outcome.errors > 0 {
                    warn!(
                        indexed = outcome.indexed,
                        errors = outcome.errors,
                        "batch partially rejected by index store"
                    );
                } else {
                    debug!(indexed = outcome.indexed, "drained batch into index");
                }
                Ok(outcome)
            }
            Err(fault) => {
                warn!(%fault, lost = records.len(), "bulk indexing failed, batch lost");
                Err(fault)
            }
        }
    }

    /// Drains batches back to back until the queue runs empty.
    ///
    /// A store fault ends the sweep early, leaving the remaining
    /// backlog queued for a later attempt.
    async fn sweep(&self) {
        loop {
            match self.drain_once().await {
                Ok(outcome) if outcome.total() > 0 => {}
                Ok(_) | Err(_) => break,
            }
        }
    }

    /// Runs the drain loop until `shutdown` is cancelled.
    ///
    /// Each sweep drains batches back to back until the queue is empty
    /// or the store faults, then sleeps for the configured interval.
    /// On cancellation one final sweep flushes whatever is still queued.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            batch_size = self.config.batch_size,
            interval_ms = self.config.interval.as_millis(),
            "index worker started"
        );
        let mut ticker = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => self.sweep().await,
            }
        }

        // Final flush so records accepted before shutdown still land.
        self.sweep().await;
        info!("index worker stopped");
    }

    /// Spawns the drain loop onto the runtime.
    #[must_use]
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndexStore;
    use crate::queue::MemoryQueueStore;
    use crate::traits::QueueStore;
    use crate::types::{LogLevel, LogRecord, SearchQuery};

    struct Fixture {
        queue: Arc<MemoryQueueStore>,
        index: Arc<MemoryIndexStore>,
        worker: IndexWorker,
    }

    fn fixture(config: IndexWorkerConfig) -> Fixture {
        let queue = Arc::new(MemoryQueueStore::new());
        let index = Arc::new(MemoryIndexStore::new());
        let collector = Arc::new(LogCollector::new(
            Arc::clone(&queue) as Arc<dyn QueueStore>
        ));
        let worker = IndexWorker::new(
            Arc::clone(&collector),
            Arc::clone(&index) as Arc<dyn IndexStore>,
            config,
        );
        Fixture {
            queue,
            index,
            worker,
        }
    }

    async fn queue_records(fixture: &Fixture, count: usize) {
        let collector = LogCollector::new(Arc::clone(&fixture.queue) as Arc<dyn QueueStore>);
        for i in 0..count {
            let record = LogRecord::new(LogLevel::Info, format!("message {i}"), "svc");
            assert!(collector.push(&record).await);
        }
    }

    #[tokio::test]
    async fn drain_moves_queued_records_into_index() {
        let f = fixture(IndexWorkerConfig::default());
        queue_records(&f, 3).await;

        let outcome = f.worker.drain_once().await.expect("drain");
        assert_eq!(outcome.indexed, 3);
        assert_eq!(outcome.errors, 0);
        assert_eq!(f.index.doc_count(), 3);

        // Queue is now empty.
        assert_eq!(f.worker.drain_once().await.expect("drain").total(), 0);
    }

    #[tokio::test]
    async fn drain_respects_batch_size() {
        let f = fixture(IndexWorkerConfig {
            batch_size: 2,
            ..IndexWorkerConfig::default()
        });
        queue_records(&f, 5).await;

        assert_eq!(f.worker.drain_once().await.expect("drain").indexed, 2);
        assert_eq!(f.worker.drain_once().await.expect("drain").indexed, 2);
        assert_eq!(f.worker.drain_once().await.expect("drain").indexed, 1);
        assert_eq!(f.index.doc_count(), 5);
    }

    #[tokio::test]
    async fn drained_records_are_searchable() {
        let f = fixture(IndexWorkerConfig::default());
        let collector = LogCollector::new(Arc::clone(&f.queue) as Arc<dyn QueueStore>);
        let record = LogRecord::new(LogLevel::Error, "disk full on /var", "svc1");
        assert!(collector.push(&record).await);

        f.worker.drain_once().await.expect("drain");

        let query = SearchQuery::default().with_text("disk");
        let hits = f.index.search(&query).await.expect("search");
        assert_eq!(hits.total, 1);
        assert_eq!(hits.records[0].source, "svc1");
    }

    #[tokio::test]
    async fn store_fault_loses_only_the_popped_batch() {
        let f = fixture(IndexWorkerConfig::default());
        queue_records(&f, 4).await;
        f.index.set_failing(true);

        assert!(f.worker.drain_once().await.is_err());

        // The batch was popped before the fault, so it is gone.
        f.index.set_failing(false);
        assert_eq!(f.worker.drain_once().await.expect("drain").total(), 0);
        assert_eq!(f.index.doc_count(), 0);
    }

    #[tokio::test]
    async fn sweep_stops_at_store_outage_and_keeps_backlog_queued() {
        let f = fixture(IndexWorkerConfig {
            batch_size: 2,
            ..IndexWorkerConfig::default()
        });
        queue_records(&f, 5).await;
        f.index.set_failing(true);

        // One sweep during the outage loses at most one popped batch;
        // the rest of the backlog stays queued for the next interval.
        f.worker.sweep().await;
        assert_eq!(f.index.doc_count(), 0);
        assert_eq!(f.queue.depth().await.expect("depth"), 3);

        // After recovery the remaining records drain normally.
        f.index.set_failing(false);
        f.worker.sweep().await;
        assert_eq!(f.index.doc_count(), 3);
        assert_eq!(f.queue.depth().await.expect("depth"), 0);
    }

    #[tokio::test]
    async fn run_drains_and_flushes_on_shutdown() {
        let f = fixture(IndexWorkerConfig {
            batch_size: 10,
            interval: Duration::from_millis(10),
        });
        queue_records(&f, 3).await;

        let index = Arc::clone(&f.index);
        let queue = Arc::clone(&f.queue);
        let token = CancellationToken::new();
        let handle = f.worker.spawn(token.clone());

        // Wait for the first sweep to pick everything up.
        for _ in 0..50 {
            if index.doc_count() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(index.doc_count(), 3);

        // Records queued right before shutdown are flushed on the way out.
        let collector = LogCollector::new(Arc::clone(&queue) as Arc<dyn QueueStore>);
        assert!(
            collector
                .push(&LogRecord::new(LogLevel::Info, "late", "svc"))
                .await
        );
        token.cancel();
        handle.await.expect("worker join");
        assert_eq!(index.doc_count(), 4);
    }
}
