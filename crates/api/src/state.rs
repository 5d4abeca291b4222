use std::sync::Arc;
use std::time::Duration;

use envmon_events::{AlertNotifier, ChangeFeed};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::pipeline::store::TelemetryStore;
use crate::pipeline::IngestPipeline;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Reading and alert persistence.
    pub store: Arc<dyn TelemetryStore>,
    /// Ingestion and alerting pipeline.
    pub pipeline: Arc<IngestPipeline>,
    /// Live change feed of stored readings.
    pub feed: Arc<ChangeFeed>,
    /// Cancelled when the server begins shutting down; long-lived
    /// connections close on it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the pipeline from its collaborators.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn TelemetryStore>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        let feed = Arc::new(ChangeFeed::default());
        let pipeline = IngestPipeline::new(
            Arc::clone(&store),
            notifier,
            Arc::clone(&feed),
            config.thresholds,
            Duration::from_secs(config.notify_timeout_secs),
        );
        Self {
            config: Arc::new(config),
            store,
            pipeline: Arc::new(pipeline),
            feed,
            shutdown: CancellationToken::new(),
        }
    }
}
