//! Query construction for the document search engine.
//!
//! Pure functions that translate a [`SearchQuery`] into the store's
//! JSON query DSL and parse responses back. No I/O happens here, which
//! keeps the clause logic unit-testable without a running store.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::error::{PipelineError, Result};
use crate::types::{
    ErrorPattern, LogRecord, MAX_PATTERN_SERVICES, MAX_PATTERNS, SearchHits, SearchQuery,
};

/// Builds the compound search body for a [`SearchQuery`].
///
/// Free text becomes a multi_match over message, source and service;
/// level/source/service become exact-match term clauses; supplied time
/// bounds become an inclusive range clause. All clauses are
/// AND-combined, sorted newest first, and paginated with the clamped
/// limit.
#[must_use]
pub fn search_body(query: &SearchQuery) -> Value {
    let mut must: Vec<Value> = Vec::new();

    if let Some(text) = query.query.as_deref() {
        if !text.is_empty() {
            must.push(json!({
                "multi_match": {
                    "query": text,
                    "fields": ["message", "source", "service"],
                }
            }));
        }
    }

    if let Some(level) = query.level {
        must.push(json!({ "term": { "level": level.as_str() } }));
    }
    if let Some(source) = query.source.as_deref() {
        must.push(json!({ "term": { "source": source } }));
    }
    if let Some(service) = query.service.as_deref() {
        must.push(json!({ "term": { "service": service } }));
    }

    if query.start_time.is_some() || query.end_time.is_some() {
        let mut range = serde_json::Map::new();
        if let Some(start) = query.start_time {
            range.insert("gte".to_string(), json!(start.to_rfc3339()));
        }
        if let Some(end) = query.end_time {
            range.insert("lte".to_string(), json!(end.to_rfc3339()));
        }
        must.push(json!({ "range": { "timestamp": Value::Object(range) } }));
    }

    json!({
        "query": { "bool": { "must": must } },
        "sort": [{ "timestamp": { "order": "desc" } }],
        "size": query.effective_limit(),
        "from": query.offset,
    })
}

/// Builds the error-pattern aggregation body for a lookback window.
///
/// Filters to ERROR/CRITICAL records in the trailing `hours` window and
/// groups them by the exact message text, with min/max timestamps and a
/// capped per-group service breakdown.
#[must_use]
pub fn pattern_body(hours: u32) -> Value {
    json!({
        "query": {
            "bool": {
                "must": [
                    { "terms": { "level": ["ERROR", "CRITICAL"] } },
                    { "range": { "timestamp": { "gte": format!("now-{hours}h"), "lte": "now" } } },
                ]
            }
        },
        "aggs": {
            "error_patterns": {
                "terms": { "field": "message.keyword", "size": MAX_PATTERNS },
                "aggs": {
                    "first_seen": { "min": { "field": "timestamp" } },
                    "last_seen": { "max": { "field": "timestamp" } },
                    "services": { "terms": { "field": "service", "size": MAX_PATTERN_SERVICES } },
                }
            }
        },
        "size": 0,
    })
}

/// Parses a search response into records plus the total match count.
///
/// # Errors
///
/// Returns an error if the response is missing the hits structure or a
/// document no longer deserializes as a [`LogRecord`].
pub fn parse_hits(body: &Value) -> Result<SearchHits> {
    let hits = body
        .get("hits")
        .ok_or_else(|| PipelineError::MalformedResponse("missing hits".to_string()))?;

    let total = hits
        .pointer("/total/value")
        .and_then(Value::as_u64)
        .ok_or_else(|| PipelineError::MalformedResponse("missing hits.total.value".to_string()))?;

    let raw = hits
        .get("hits")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::MalformedResponse("missing hits.hits".to_string()))?;

    let mut records = Vec::with_capacity(raw.len());
    for hit in raw {
        let source = hit
            .get("_source")
            .ok_or_else(|| PipelineError::MalformedResponse("hit without _source".to_string()))?;
        records.push(serde_json::from_value::<LogRecord>(source.clone())?);
    }

    Ok(SearchHits { records, total })
}

/// Parses an aggregation response into ranked error patterns.
///
/// # Errors
///
/// Returns an error if the aggregation structure is missing or a bucket
/// carries unusable timestamps.
pub fn parse_patterns(body: &Value) -> Result<Vec<ErrorPattern>> {
    let buckets = body
        .pointer("/aggregations/error_patterns/buckets")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            PipelineError::MalformedResponse("missing error_patterns buckets".to_string())
        })?;

    let mut patterns = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let pattern = bucket
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::MalformedResponse("bucket without key".to_string()))?
            .to_string();
        let count = bucket
            .get("doc_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let first_seen = parse_agg_timestamp(bucket, "first_seen")?;
        let last_seen = parse_agg_timestamp(bucket, "last_seen")?;

        let services = bucket
            .pointer("/services/buckets")
            .and_then(Value::as_array)
            .map(|services| {
                services
                    .iter()
                    .filter_map(|s| s.get("key").and_then(Value::as_str))
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        patterns.push(ErrorPattern {
            pattern,
            count,
            first_seen,
            last_seen,
            services,
        });
    }

    Ok(patterns)
}

/// Reads a min/max timestamp sub-aggregation from a bucket.
///
/// Prefers the formatted string; falls back to the epoch-millis value.
fn parse_agg_timestamp(bucket: &Value, name: &str) -> Result<DateTime<Utc>> {
    if let Some(formatted) = bucket
        .pointer(&format!("/{name}/value_as_string"))
        .and_then(Value::as_str)
    {
        return DateTime::parse_from_rfc3339(formatted)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                PipelineError::MalformedResponse(format!("bad {name} timestamp: {e}"))
            });
    }

    bucket
        .pointer(&format!("/{name}/value"))
        .and_then(Value::as_f64)
        .and_then(|millis| DateTime::from_timestamp_millis(millis as i64))
        .ok_or_else(|| PipelineError::MalformedResponse(format!("missing {name} value")))
}
