//! Index store backends.
//!
//! This module provides:
//! - [`HttpIndexStore`] — client for an Elasticsearch-compatible
//!   document search engine over HTTP+JSON
//! - [`MemoryIndexStore`] — in-process implementation of the same
//!   contract for tests and local runs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::query;
use crate::traits::{BoxFuture, IndexStore};
use crate::types::{
    BatchOutcome, ErrorPattern, LogRecord, MAX_PATTERN_SERVICES, MAX_PATTERNS, SearchHits,
    SearchQuery,
};

/// Connect timeout for the search engine client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request timeout for the search engine client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The document schema for the log index.
///
/// `message` is full-text analyzed with a `keyword` sub-field so the
/// pattern aggregation can group on the exact text.
fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "timestamp": { "type": "date" },
                "level": { "type": "keyword" },
                "message": {
                    "type": "text",
                    "analyzer": "standard",
                    "fields": { "keyword": { "type": "keyword", "ignore_above": 8191 } }
                },
                "source": { "type": "keyword" },
                "service": { "type": "keyword" },
                "trace_id": { "type": "keyword" },
                "span_id": { "type": "keyword" },
                "metadata": { "type": "object" }
            }
        }
    })
}

/// Client for an Elasticsearch-compatible document search engine.
#[derive(Debug, Clone)]
pub struct HttpIndexStore {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl HttpIndexStore {
    /// Creates a client for the search engine at `base_url`, writing to
    /// the named index.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
        })
    }

    /// The index this store writes to.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index
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

    async fn run_search(&self, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/{}/_search", self.base_url, self.index))
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Builds the NDJSON payload for a bulk request.
    fn bulk_payload(&self, records: &[LogRecord]) -> Result<String> {
        let action = serde_json::to_string(&json!({ "index": { "_index": self.index } }))?;
        let mut payload = String::new();
        for record in records {
            payload.push_str(&action);
            payload.push('\n');
            payload.push_str(&serde_json::to_string(record)?);
            payload.push('\n');
        }
        Ok(payload)
    }

    /// Counts item-level failures in a bulk response.
    fn bulk_errors(body: &Value) -> usize {
        body.get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.pointer("/index/error").is_some())
                    .count()
            })
            .unwrap_or(0)
    }
}

impl IndexStore for HttpIndexStore {
    fn ensure_schema(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let url = format!("{}/{}", self.base_url, self.index);
            let response = self.client.head(&url).send().await?;

            if response.status().is_success() {
                debug!(index = %self.index, "index already exists");
                return Ok(());
            }
            if response.status() != reqwest::StatusCode::NOT_FOUND {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(PipelineError::UnexpectedStatus { status, body });
            }

            let response = self.client.put(&url).json(&index_mapping()).send().await?;
            Self::check(response).await?;
            info!(index = %self.index, "created log index");
            Ok(())
        })
    }

    fn index_one<'a>(&'a self, record: &'a LogRecord) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let response = self
                .client
                .post(format!("{}/{}/_doc", self.base_url, self.index))
                .json(record)
                .send()
                .await?;
            Self::check(response).await?;
            Ok(())
        })
    }

    fn index_batch<'a>(&'a self, records: &'a [LogRecord]) -> BoxFuture<'a, Result<BatchOutcome>> {
        Box::pin(async move {
            if records.is_empty() {
                return Ok(BatchOutcome::default());
            }

            let payload = self.bulk_payload(records)?;
            let response = self
                .client
                .post(format!("{}/_bulk", self.base_url))
                .header("content-type", "application/x-ndjson")
                .body(payload)
                .send()
                .await?;
            let body: Value = Self::check(response).await?.json().await?;

            let errors = Self::bulk_errors(&body);
            Ok(BatchOutcome {
                indexed: records.len().saturating_sub(errors),
                errors,
            })
        })
    }

    fn search<'a>(&'a self, search_query: &'a SearchQuery) -> BoxFuture<'a, Result<SearchHits>> {
        Box::pin(async move {
            let body = self.run_search(&query::search_body(search_query)).await?;
            query::parse_hits(&body)
        })
    }

    fn error_patterns(&self, hours: u32) -> BoxFuture<'_, Result<Vec<ErrorPattern>>> {
        Box::pin(async move {
            let body = self.run_search(&query::pattern_body(hours)).await?;
            query::parse_patterns(&body)
        })
    }
}

/// In-process index store with the same observable semantics as the
/// HTTP backend: AND-combined filters, newest-first ordering, clamped
/// pagination, and literal-message pattern grouping.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    docs: RwLock<Vec<LogRecord>>,
    failing: AtomicBool,
}

impl MemoryIndexStore {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with a transport fault.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Number of stored documents.
    #[must_use]
    pub fn doc_count(&self) -> usize {
        self.docs.read().len()
    }

    fn fault(&self) -> Result<()> {
        if self.failing.load(Ordering::Acquire) {
            Err(PipelineError::Unavailable("index store offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn aggregate_patterns(&self, hours: u32) -> Vec<ErrorPattern> {
        struct Group {
            count: u64,
            first_seen: DateTime<Utc>,
            last_seen: DateTime<Utc>,
            service_counts: HashMap<String, u64>,
        }

        let now = Utc::now();
        let cutoff = now - chrono::Duration::hours(i64::from(hours));

        let mut groups: HashMap<String, Group> = HashMap::new();
        for doc in self.docs.read().iter() {
            if !doc.level.is_error() || doc.timestamp < cutoff || doc.timestamp > now {
                continue;
            }
            let group = groups.entry(doc.message.clone()).or_insert(Group {
                count: 0,
                first_seen: doc.timestamp,
                last_seen: doc.timestamp,
                service_counts: HashMap::new(),
            });
            group.count += 1;
            group.first_seen = group.first_seen.min(doc.timestamp);
            group.last_seen = group.last_seen.max(doc.timestamp);
            if let Some(service) = &doc.service {
                *group.service_counts.entry(service.clone()).or_insert(0) += 1;
            }
        }

        let mut patterns: Vec<ErrorPattern> = groups
            .into_iter()
            .map(|(pattern, group)| {
                let mut services: Vec<(String, u64)> = group.service_counts.into_iter().collect();
                services.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                services.truncate(MAX_PATTERN_SERVICES);

                ErrorPattern {
                    pattern,
                    count: group.count,
                    first_seen: group.first_seen,
                    last_seen: group.last_seen,
                    services: services.into_iter().map(|(name, _)| name).collect(),
                }
            })
            .collect();

        patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pattern.cmp(&b.pattern)));
        patterns.truncate(MAX_PATTERNS);
        patterns
    }
}

impl IndexStore for MemoryIndexStore {
    fn ensure_schema(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.fault() })
    }

    fn index_one<'a>(&'a self, record: &'a LogRecord) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.fault()?;
            self.docs.write().push(record.clone());
            Ok(())
        })
    }

    fn index_batch<'a>(&'a self, records: &'a [LogRecord]) -> BoxFuture<'a, Result<BatchOutcome>> {
        Box::pin(async move {
            self.fault()?;
            self.docs.write().extend_from_slice(records);
            Ok(BatchOutcome {
                indexed: records.len(),
                errors: 0,
            })
        })
    }

    fn search<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<SearchHits>> {
        Box::pin(async move {
            self.fault()?;

            let mut matches: Vec<LogRecord> = self
                .docs
                .read()
                .iter()
                .filter(|doc| query.matches(doc))
                .cloned()
                .collect();
            matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

            let total = matches.len() as u64;
            let records = matches
                .into_iter()
                .skip(query.offset)
                .take(query.effective_limit())
                .collect();

            Ok(SearchHits { records, total })
        })
    }

    fn error_patterns(&self, hours: u32) -> BoxFuture<'_, Result<Vec<ErrorPattern>>> {
        Box::pin(async move {
            self.fault()?;
            Ok(self.aggregate_patterns(hours))
        })
    }
}
