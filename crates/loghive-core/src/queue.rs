//! Ingestion queue: backing stores and the collector facade.
//!
//! This module provides:
//! - [`HttpQueueStore`] — FIFO queue service client (HTTP+JSON)
//! - [`MemoryQueueStore`] — in-process FIFO for tests and local runs
//! - [`LogCollector`] — the ingestion-side facade that serializes
//!   records, swallows transport faults, and reports queue depth

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::traits::{BoxFuture, QueueStore};
use crate::types::LogRecord;

/// Connect timeout for the queue service client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request timeout for the queue service client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    item: &'a str,
}

#[derive(Debug, Deserialize)]
struct PopResponse {
    item: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LengthResponse {
    length: u64,
}

/// Client for a FIFO queue service speaking HTTP+JSON.
///
/// The protocol is list-like: `POST {base}/queues/{name}/push`,
/// `POST {base}/queues/{name}/pop` and `GET {base}/queues/{name}/length`.
#[derive(Debug, Clone)]
pub struct HttpQueueStore {
    client: reqwest::Client,
    base_url: String,
    queue: String,
}

impl HttpQueueStore {
    /// Creates a client for the queue service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, queue: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            queue: queue.into(),
        })
    }

    fn url(&self, op: &str) -> String {
        format!("{}/queues/{}/{op}", self.base_url, self.queue)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PipelineError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl QueueStore for HttpQueueStore {
    fn push_raw<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url("push"))
                .json(&PushRequest { item: payload })
                .send()
                .await?;
            Self::check(response).await?;
            Ok(())
        })
    }

    fn pop_raw(&self) -> BoxFuture<'_, Result<Option<String>>> {
        Box::pin(async move {
            let response = self.client.post(self.url("pop")).send().await?;
            let body: PopResponse = Self::check(response).await?.json().await?;
            Ok(body.item)
        })
    }

    fn depth(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let response = self.client.get(self.url("length")).send().await?;
            let body: LengthResponse = Self::check(response).await?.json().await?;
            Ok(body.length)
        })
    }
}

/// In-process FIFO queue store.
///
/// Used by tests and local runs. A fault can be injected with
/// [`MemoryQueueStore::set_failing`] to exercise the degraded paths.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    items: Mutex<VecDeque<String>>,
    failing: AtomicBool,
}

impl MemoryQueueStore {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with a transport fault.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    fn fault(&self) -> Result<()> {
        if self.failing.load(Ordering::Acquire) {
            Err(PipelineError::Unavailable("queue store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl QueueStore for MemoryQueueStore {
    fn push_raw<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.fault()?;
            self.items.lock().push_back(payload.to_string());
            Ok(())
        })
    }

    fn pop_raw(&self) -> BoxFuture<'_, Result<Option<String>>> {
        Box::pin(async move {
            self.fault()?;
            Ok(self.items.lock().pop_front())
        })
    }

    fn depth(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            self.fault()?;
            Ok(self.items.lock().len() as u64)
        })
    }
}

/// Ingestion-side facade over a [`QueueStore`].
///
/// Each record is serialized independently before enqueue, so queue
/// storage is decoupled from the in-process representation. Transport
/// faults are logged and converted into failure results; a failed push
/// is lost with no retry or redelivery, and pushes are never rejected
/// for queue depth.
pub struct LogCollector {
    queue: Arc<dyn QueueStore>,
}

impl LogCollector {
    /// Creates a collector over the given queue store handle.
    #[must_use]
    pub fn new(queue: Arc<dyn QueueStore>) -> Self {
        Self { queue }
    }

    /// Queues one record. Returns false if serialization or the push
    /// failed; the fault is logged, never raised.
    pub async fn push(&self, record: &LogRecord) -> bool {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%error, "failed to serialize record for queueing");
                return false;
            }
        };
        match self.queue.push_raw(&payload).await {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, source = %record.source, "failed to queue record, dropping");
                false
            }
        }
    }

    /// Queues records one by one, returning the count accepted.
    ///
    /// A fault on one push loses exactly that record; the rest of the
    /// batch still goes through.
    pub async fn push_batch(&self, records: &[LogRecord]) -> usize {
        let mut accepted = 0;
        for record in records {
            if self.push(record).await {
                accepted += 1;
            }
        }
        accepted
    }

    /// Pops up to `max` records in FIFO order.
    ///
    /// Stops early when the queue is empty or a transport fault occurs;
    /// payloads that no longer decode are logged and skipped.
    pub async fn pop(&self, max: usize) -> Vec<LogRecord> {
        let mut records = Vec::new();
        while records.len() < max {
            match self.queue.pop_raw().await {
                Ok(Some(payload)) => match serde_json::from_str::<LogRecord>(&payload) {
                    Ok(record) => records.push(record),
                    Err(error) => warn!(%error, "skipping undecodable queue entry"),
                },
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "queue pop failed mid-drain");
                    break;
                }
            }
        }
        records
    }

    /// Current queue depth, for monitoring only. Returns 0 on fault.
    pub async fn depth(&self) -> u64 {
        match self.queue.depth().await {
            Ok(depth) => depth,
            Err(error) => {
                warn!(%error, "failed to read queue depth");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;

    fn make_collector() -> (Arc<MemoryQueueStore>, LogCollector) {
        let store = Arc::new(MemoryQueueStore::new());
        let collector = LogCollector::new(Arc::clone(&store) as Arc<dyn QueueStore>);
        (store, collector)
    }

    #[tokio::test]
    async fn push_then_pop_is_fifo() {
        let (_, collector) = make_collector();

        assert!(collector.push(&LogRecord::new(LogLevel::Info, "first", "svc")).await);
        assert!(collector.push(&LogRecord::new(LogLevel::Info, "second", "svc")).await);
        assert!(collector.push(&LogRecord::new(LogLevel::Info, "third", "svc")).await);

        let records = collector.pop(2).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "first");
        assert_eq!(records[1].message, "second");

        let rest = collector.pop(10).await;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].message, "third");
    }

    #[tokio::test]
    async fn pop_on_empty_queue_returns_nothing() {
        let (_, collector) = make_collector();
        assert!(collector.pop(10).await.is_empty());
    }

    #[tokio::test]
    async fn push_returns_false_on_fault() {
        let (store, collector) = make_collector();
        store.set_failing(true);

        let queued = collector.push(&LogRecord::new(LogLevel::Error, "lost", "svc")).await;
        assert!(!queued);

        // The failed push is lost, by design.
        store.set_failing(false);
        assert!(collector.pop(10).await.is_empty());
    }

    #[tokio::test]
    async fn batch_counts_accepted_records() {
        let (_, collector) = make_collector();
        let records: Vec<_> = (0..5)
            .map(|i| LogRecord::new(LogLevel::Info, format!("message {i}"), "svc"))
            .collect();

        assert_eq!(collector.push_batch(&records).await, 5);
        assert_eq!(collector.depth().await, 5);
    }

    #[tokio::test]
    async fn batch_fault_loses_only_failed_records() {
        let store = Arc::new(FlakyQueue::fail_on(2));
        let collector = LogCollector::new(Arc::clone(&store) as Arc<dyn QueueStore>);
        let records: Vec<_> = (0..4)
            .map(|i| LogRecord::new(LogLevel::Info, format!("message {i}"), "svc"))
            .collect();

        // One of four pushes faults: three records are queued.
        assert_eq!(collector.push_batch(&records).await, 3);
        assert_eq!(collector.depth().await, 3);
    }

    #[tokio::test]
    async fn depth_is_zero_on_fault() {
        let (store, collector) = make_collector();
        assert!(collector.push(&LogRecord::new(LogLevel::Info, "one", "svc")).await);

        store.set_failing(true);
        assert_eq!(collector.depth().await, 0);
    }

    #[tokio::test]
    async fn pop_skips_undecodable_entries() {
        let (store, collector) = make_collector();
        store.push_raw("not json").await.expect("push raw");
        assert!(collector.push(&LogRecord::new(LogLevel::Info, "good", "svc")).await);

        let records = collector.pop(10).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "good");
    }

    #[tokio::test]
    async fn records_are_serialized_independently() {
        let (store, collector) = make_collector();
        let record = LogRecord::new(LogLevel::Warning, "raw check", "svc");
        assert!(collector.push(&record).await);

        let payload = store.pop_raw().await.expect("pop").expect("entry");
        let decoded: LogRecord = serde_json::from_str(&payload).expect("decode");
        assert_eq!(decoded.message, "raw check");
    }

    /// Queue that faults on exactly one push, by index.
    struct FlakyQueue {
        inner: MemoryQueueStore,
        fail_index: usize,
        pushes: std::sync::atomic::AtomicUsize,
    }

    impl FlakyQueue {
        fn fail_on(fail_index: usize) -> Self {
            Self {
                inner: MemoryQueueStore::new(),
                fail_index,
                pushes: std::sync::atomic::AtomicUsize::new(0),
            }
        }
    }

    impl QueueStore for FlakyQueue {
        fn push_raw<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                let n = self.pushes.fetch_add(1, Ordering::SeqCst);
                if n == self.fail_index {
                    return Err(PipelineError::Unavailable("injected".to_string()));
                }
                self.inner.push_raw(payload).await
            })
        }

        fn pop_raw(&self) -> BoxFuture<'_, Result<Option<String>>> {
            self.inner.pop_raw()
        }

        fn depth(&self) -> BoxFuture<'_, Result<u64>> {
            self.inner.depth()
        }
    }
}
