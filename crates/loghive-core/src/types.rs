//! Core types for the log aggregation pipeline.
//!
//! This module provides:
//! - [`LogLevel`] — Closed set of severity levels
//! - [`LogRecord`] — Structured log record flowing through the pipeline
//! - [`LogBatch`] — Ordered batch of records with an optional batch id
//! - [`SearchQuery`] — Filtered/full-text search request
//! - [`SearchResult`] — Paged search response
//! - [`ErrorPattern`] — Aggregated error-message group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// Log severity levels, ordered from least to most severe.
///
/// The set is closed: deserializing any other string fails, so invalid
/// levels are unrepresentable after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Detailed debugging information
    Debug = 0,
    /// General information
    Info = 1,
    /// Warning conditions
    Warning = 2,
    /// Error conditions
    Error = 3,
    /// Critical failures
    Critical = 4,
}

impl LogLevel {
    /// Returns the wire-format string representation of this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Returns true if this level counts as an error for pattern analysis.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

/// A structured log record.
///
/// Created at the ingestion boundary and immutable thereafter. `level`,
/// `message` and `source` are always present; everything else is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// When the event happened; defaults to ingestion time if absent.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Severity level.
    pub level: LogLevel,
    /// The log message (unbounded length).
    pub message: String,
    /// Short identifier of the emitting source.
    pub source: String,
    /// Optional service identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Optional trace correlation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Optional span correlation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    /// Open-ended key/value metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl LogRecord {
    /// Creates a record with the required fields, timestamped now.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            source: source.into(),
            service: None,
            trace_id: None,
            span_id: None,
            metadata: None,
        }
    }

    /// Sets the service identifier.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds a metadata field.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

/// An ordered batch of records plus an optional caller-supplied batch id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogBatch {
    /// The records, in the caller's order.
    pub logs: Vec<LogRecord>,
    /// Caller-supplied batch identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

/// Default page size for searches.
pub const DEFAULT_LIMIT: usize = 100;

/// Hard server-side ceiling on page size, regardless of client input.
pub const MAX_LIMIT: usize = 1000;

/// Maximum number of error-pattern groups returned by the analyzer.
pub const MAX_PATTERNS: usize = 50;

/// Maximum distinct services reported per error pattern.
pub const MAX_PATTERN_SERVICES: usize = 10;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// A filtered/full-text search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query matched against message, source and service.
    #[serde(default)]
    pub query: Option<String>,
    /// Exact-match level filter.
    #[serde(default)]
    pub level: Option<LogLevel>,
    /// Exact-match source filter.
    #[serde(default)]
    pub source: Option<String>,
    /// Exact-match service filter.
    #[serde(default)]
    pub service: Option<String>,
    /// Inclusive lower time bound; absent means unconstrained.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper time bound; absent means unconstrained.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Requested page size (defaults to 100, clamped to 1000).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Result offset for pagination.
    #[serde(default)]
    pub offset: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: None,
            level: None,
            source: None,
            service: None,
            start_time: None,
            end_time: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl SearchQuery {
    /// Validates the query at the model boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if `limit` exceeds [`MAX_LIMIT`].
    pub fn validate(&self) -> Result<()> {
        if self.limit > MAX_LIMIT {
            return Err(PipelineError::InvalidQuery(format!(
                "limit must be <= {MAX_LIMIT}, got {}",
                self.limit
            )));
        }
        Ok(())
    }

    /// The page size actually used, clamped to [`MAX_LIMIT`].
    ///
    /// Clamping applies regardless of client input; this is a
    /// resource-protection invariant, not merely a default.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.min(MAX_LIMIT)
    }

    /// Sets the free-text query.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.query = Some(text.into());
        self
    }

    /// Sets the level filter.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the source filter.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the service filter.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the time range bounds.
    #[must_use]
    pub const fn with_time_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Sets the pagination window.
    #[must_use]
    pub const fn with_page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Checks whether a record matches every filter clause of this query.
    ///
    /// This is the in-process equivalent of the store-side compound
    /// filter: all clauses AND-combined, free text matched against
    /// message, source and service, time bounds inclusive.
    #[must_use]
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(level) = self.level {
            if record.level != level {
                return false;
            }
        }
        if let Some(ref source) = self.source {
            if record.source != *source {
                return false;
            }
        }
        if let Some(ref service) = self.service {
            if record.service.as_deref() != Some(service.as_str()) {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if record.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if record.timestamp > end {
                return false;
            }
        }
        if let Some(ref text) = self.query {
            let needle = text.to_lowercase();
            if !needle.is_empty() {
                let in_message = record.message.to_lowercase().contains(&needle);
                let in_source = record.source.to_lowercase().contains(&needle);
                let in_service = record
                    .service
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase().contains(&needle));
                if !(in_message || in_source || in_service) {
                    return false;
                }
            }
        }
        true
    }
}

/// A page of search results, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matching records, descending by timestamp.
    pub logs: Vec<LogRecord>,
    /// Count of all matches, not just the returned page.
    pub total_count: u64,
    /// Wall-clock duration of the query round-trip in milliseconds.
    pub took_ms: f64,
}

impl SearchResult {
    /// The degraded result returned when the backing store faults.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            logs: Vec::new(),
            total_count: 0,
            took_ms: 0.0,
        }
    }
}

/// An aggregated group of identical error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPattern {
    /// The exact message text used as the grouping key.
    pub pattern: String,
    /// Occurrences within the analysis window.
    pub count: u64,
    /// Earliest occurrence in the window.
    pub first_seen: DateTime<Utc>,
    /// Latest occurrence in the window.
    pub last_seen: DateTime<Utc>,
    /// Distinct services that produced this message, capped at
    /// [`MAX_PATTERN_SERVICES`].
    pub services: Vec<String>,
}

/// Outcome of a bulk indexing operation.
///
/// A partial failure does not fail the whole batch; item-level errors
/// are counted instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Documents successfully indexed.
    pub indexed: usize,
    /// Documents the store rejected.
    pub errors: usize,
}

impl BatchOutcome {
    /// Total documents the outcome accounts for.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.indexed + self.errors
    }
}

/// Raw store-side search result: matching records plus the total count.
#[derive(Debug, Clone)]
pub struct SearchHits {
    /// Records for the requested page, newest first.
    pub records: Vec<LogRecord>,
    /// Total number of matches in the store.
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LogLevel::Debug, "\"DEBUG\"")]
    #[test_case(LogLevel::Info, "\"INFO\"")]
    #[test_case(LogLevel::Warning, "\"WARNING\"")]
    #[test_case(LogLevel::Error, "\"ERROR\"")]
    #[test_case(LogLevel::Critical, "\"CRITICAL\"")]
    fn level_serializes_uppercase(level: LogLevel, expected: &str) {
        let json = serde_json::to_string(&level).expect("serialize");
        assert_eq!(json, expected);

        let back: LogLevel = serde_json::from_str(expected).expect("deserialize");
        assert_eq!(back, level);
    }

    #[test]
    fn level_rejects_unknown_values() {
        let result: std::result::Result<LogLevel, _> = serde_json::from_str("\"FATAL\"");
        assert!(result.is_err());

        let result: std::result::Result<LogLevel, _> = serde_json::from_str("\"info\"");
        assert!(result.is_err(), "levels are case-sensitive on the wire");
    }

    #[test]
    fn level_ordering_and_error_classification() {
        assert!(LogLevel::Debug < LogLevel::Critical);
        assert!(LogLevel::Error.is_error());
        assert!(LogLevel::Critical.is_error());
        assert!(!LogLevel::Warning.is_error());
    }

    #[test]
    fn record_timestamp_defaults_to_ingestion_time() {
        let before = Utc::now();
        let record: LogRecord = serde_json::from_str(
            r#"{"level":"INFO","message":"hello","source":"svc1"}"#,
        )
        .expect("deserialize");
        let after = Utc::now();

        assert!(record.timestamp >= before && record.timestamp <= after);
        assert_eq!(record.level, LogLevel::Info);
        assert!(record.service.is_none());
    }

    #[test]
    fn record_rejects_missing_required_fields() {
        let result: std::result::Result<LogRecord, _> =
            serde_json::from_str(r#"{"level":"INFO","message":"no source"}"#);
        assert!(result.is_err());

        let result: std::result::Result<LogRecord, _> =
            serde_json::from_str(r#"{"message":"no level","source":"svc"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn record_serialization_roundtrip() {
        let record = LogRecord::new(LogLevel::Error, "disk full", "svc1")
            .with_service("billing")
            .with_metadata("shard", serde_json::json!(3));

        let json = serde_json::to_string(&record).expect("serialize");
        let back: LogRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }

    #[test]
    fn query_defaults() {
        let query: SearchQuery = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.offset, 0);
        assert!(query.query.is_none());
    }

    #[test]
    fn query_validate_rejects_oversized_limit() {
        let query = SearchQuery::default().with_page(1001, 0);
        assert!(query.validate().is_err());

        let query = SearchQuery::default().with_page(1000, 0);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn query_effective_limit_clamps() {
        let query = SearchQuery::default().with_page(5000, 0);
        assert_eq!(query.effective_limit(), MAX_LIMIT);

        let query = SearchQuery::default().with_page(50, 0);
        assert_eq!(query.effective_limit(), 50);
    }

    #[test]
    fn query_matches_all_clauses_and_combined() {
        let record = LogRecord::new(LogLevel::Error, "connection refused", "gateway")
            .with_service("billing");

        let query = SearchQuery::default()
            .with_level(LogLevel::Error)
            .with_source("gateway")
            .with_service("billing")
            .with_text("refused");
        assert!(query.matches(&record));

        let query = SearchQuery::default()
            .with_level(LogLevel::Error)
            .with_source("other");
        assert!(!query.matches(&record));
    }

    #[test]
    fn query_text_matches_any_of_message_source_service() {
        let record = LogRecord::new(LogLevel::Info, "started", "gateway").with_service("billing");

        assert!(SearchQuery::default().with_text("start").matches(&record));
        assert!(SearchQuery::default().with_text("GATEWAY").matches(&record));
        assert!(SearchQuery::default().with_text("billing").matches(&record));
        assert!(!SearchQuery::default().with_text("checkout").matches(&record));
    }

    #[test]
    fn query_time_bounds_are_inclusive_and_optional() {
        let ts = Utc::now();
        let record = LogRecord::new(LogLevel::Info, "tick", "clock").with_timestamp(ts);

        let query = SearchQuery::default().with_time_range(Some(ts), Some(ts));
        assert!(query.matches(&record));

        let later = ts + chrono::Duration::seconds(1);
        let query = SearchQuery::default().with_time_range(Some(later), None);
        assert!(!query.matches(&record));

        let query = SearchQuery::default().with_time_range(None, None);
        assert!(query.matches(&record));
    }

    #[test]
    fn batch_outcome_total() {
        let outcome = BatchOutcome {
            indexed: 7,
            errors: 3,
        };
        assert_eq!(outcome.total(), 10);
    }

    #[test]
    fn empty_result_is_zeroed() {
        let result = SearchResult::empty();
        assert!(result.logs.is_empty());
        assert_eq!(result.total_count, 0);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn effective_limit_never_exceeds_ceiling(limit in any::<usize>()) {
                let query = SearchQuery::default().with_page(limit, 0);
                prop_assert!(query.effective_limit() <= MAX_LIMIT);
                prop_assert_eq!(query.effective_limit(), limit.min(MAX_LIMIT));
            }

            #[test]
            fn record_roundtrips_for_arbitrary_text(
                message in ".*",
                source in "[a-z][a-z0-9-]{0,30}",
            ) {
                let record = LogRecord::new(LogLevel::Warning, message, source);
                let json = serde_json::to_string(&record).expect("serialize");
                let back: LogRecord = serde_json::from_str(&json).expect("deserialize");
                prop_assert_eq!(back, record);
            }

            #[test]
            fn record_always_matches_a_range_containing_its_timestamp(
                before_secs in 0i64..86_400,
                after_secs in 0i64..86_400,
            ) {
                let ts = Utc::now();
                let record = LogRecord::new(LogLevel::Info, "tick", "clock").with_timestamp(ts);
                let query = SearchQuery::default().with_time_range(
                    Some(ts - chrono::Duration::seconds(before_secs)),
                    Some(ts + chrono::Duration::seconds(after_secs)),
                );
                prop_assert!(query.matches(&record));
            }
        }
    }
}
