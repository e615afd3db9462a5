//! API server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use loghive_core::worker::{DEFAULT_BATCH_SIZE, DEFAULT_DRAIN_INTERVAL};
use tracing::warn;

/// Configuration for the API server and pipeline wiring.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Base URL of the queue service.
    pub queue_url: String,
    /// Queue name used for buffered records.
    pub queue_name: String,
    /// Base URL of the index store.
    pub index_url: String,
    /// Index name used for persisted records.
    pub index_name: String,
    /// Maximum records drained per batch by the index worker.
    pub drain_batch_size: usize,
    /// Pause between drain sweeps once the queue runs empty.
    pub drain_interval: Duration,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            queue_url: "http://localhost:6400".to_string(),
            queue_name: "log_queue".to_string(),
            index_url: "http://localhost:9200".to_string(),
            index_name: "logs".to_string(),
            drain_batch_size: DEFAULT_BATCH_SIZE,
            drain_interval: DEFAULT_DRAIN_INTERVAL,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Creates a configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Loads configuration from `LOGHIVE_*` environment variables,
    /// falling back to defaults for anything unset.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(addr) = read_env("LOGHIVE_BIND_ADDR") {
            match addr.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(error) => warn!(%error, value = %addr, "ignoring invalid LOGHIVE_BIND_ADDR"),
            }
        }
        if let Some(url) = read_env("LOGHIVE_QUEUE_URL") {
            config.queue_url = url;
        }
        if let Some(name) = read_env("LOGHIVE_QUEUE_NAME") {
            config.queue_name = name;
        }
        if let Some(url) = read_env("LOGHIVE_INDEX_URL") {
            config.index_url = url;
        }
        if let Some(name) = read_env("LOGHIVE_INDEX_NAME") {
            config.index_name = name;
        }
        if let Some(size) = read_env("LOGHIVE_DRAIN_BATCH_SIZE") {
            match size.parse() {
                Ok(size) => config.drain_batch_size = size,
                Err(error) => {
                    warn!(%error, value = %size, "ignoring invalid LOGHIVE_DRAIN_BATCH_SIZE");
                }
            }
        }
        if let Some(ms) = read_env("LOGHIVE_DRAIN_INTERVAL_MS") {
            match ms.parse() {
                Ok(ms) => config.drain_interval = Duration::from_millis(ms),
                Err(error) => {
                    warn!(%error, value = %ms, "ignoring invalid LOGHIVE_DRAIN_INTERVAL_MS");
                }
            }
        }
        if let Some(origins) = read_env("LOGHIVE_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        config
    }

    /// Sets the queue service location.
    #[must_use]
    pub fn with_queue(mut self, url: impl Into<String>, name: impl Into<String>) -> Self {
        self.queue_url = url.into();
        self.queue_name = name.into();
        self
    }

    /// Sets the index store location.
    #[must_use]
    pub fn with_index(mut self, url: impl Into<String>, name: impl Into<String>) -> Self {
        self.index_url = url.into();
        self.index_name = name.into();
        self
    }

    /// Sets the drain batch size.
    #[must_use]
    pub const fn with_drain_batch_size(mut self, size: usize) -> Self {
        self.drain_batch_size = size;
        self
    }

    /// Sets the drain interval.
    #[must_use]
    pub const fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    /// Adds a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
