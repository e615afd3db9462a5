//! Loghive API binary.
//!
//! Wires the queue and index store clients into the pipeline, starts
//! the background index worker and serves the HTTP API until Ctrl-C.

use std::sync::Arc;

use loghive_api::{ApiConfig, ApiError, ApiResult, ApiServer};
use loghive_core::{
    HttpIndexStore, HttpQueueStore, IndexStore, IndexWorker, IndexWorkerConfig, LogCollector,
    QueueStore, SearchService,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("loghive_api=info,loghive_core=info")),
        )
        .init();

    let config = ApiConfig::from_env();
    info!(
        bind = %config.bind_addr,
        queue = %config.queue_url,
        index = %config.index_url,
        "loghive-api starting"
    );

    let queue: Arc<dyn QueueStore> =
        Arc::new(HttpQueueStore::new(&config.queue_url, &config.queue_name)
            .map_err(|e| ApiError::Internal(e.to_string()))?);
    let index: Arc<dyn IndexStore> =
        Arc::new(HttpIndexStore::new(&config.index_url, &config.index_name)
            .map_err(|e| ApiError::Internal(e.to_string()))?);

    // Best effort: the store may come up after us, in which case bulk
    // indexing creates the index with dynamic mappings instead.
    if let Err(error) = index.ensure_schema().await {
        warn!(%error, "could not create index schema at startup");
    }

    let collector = Arc::new(LogCollector::new(Arc::clone(&queue)));
    let search = Arc::new(SearchService::new(Arc::clone(&index)));

    let shutdown = CancellationToken::new();
    let worker = IndexWorker::new(
        Arc::clone(&collector),
        Arc::clone(&index),
        IndexWorkerConfig {
            batch_size: config.drain_batch_size,
            interval: config.drain_interval,
        },
    );
    let worker_handle = worker.spawn(shutdown.clone());

    let server = ApiServer::new(config, collector, search);
    server
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    // Stop the worker last so it can flush what the server accepted.
    shutdown.cancel();
    if let Err(error) = worker_handle.await {
        warn!(%error, "index worker did not shut down cleanly");
    }

    info!("loghive-api stopped");
    Ok(())
}
