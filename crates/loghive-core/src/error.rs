//! Error types for the ingestion-to-search pipeline.

use thiserror::Error;

/// Errors that can occur in the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A network fault while talking to a backing store.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backing store answered with an unexpected HTTP status.
    #[error("store returned status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code returned by the store.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A store response was missing an expected field.
    #[error("malformed store response: {0}")]
    MalformedResponse(String),

    /// The backing store is unavailable.
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    /// A query failed model-boundary validation.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = PipelineError::UnexpectedStatus {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "store returned status 502: bad gateway");

        let err = PipelineError::MalformedResponse("missing hits".to_string());
        assert_eq!(err.to_string(), "malformed store response: missing hits");

        let err = PipelineError::Unavailable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "backing store unavailable: connection refused"
        );

        let err = PipelineError::InvalidQuery("limit must be <= 1000".to_string());
        assert_eq!(err.to_string(), "invalid query: limit must be <= 1000");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PipelineError>();
    }

    #[test]
    fn error_from_serde() {
        let serde_err = serde_json::from_str::<i32>("not a number")
            .err()
            .map(PipelineError::from);
        assert!(matches!(serde_err, Some(PipelineError::Serialization(_))));
    }
}
