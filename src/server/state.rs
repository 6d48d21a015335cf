use crate::{
    channels::ChannelRegistry, config::Config, error::Result, metrics, upstream::UpstreamClient,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all handlers.
///
/// Everything in here is read-only after startup, so requests never contend
/// on it.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Channel lookup table
    pub channels: Arc<ChannelRegistry>,
    /// Shared upstream client for connection pooling
    pub upstream: UpstreamClient,
    /// Prometheus handle, `None` if another recorder owns the process
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState with the given configuration and channels
    pub fn new(config: Config, channels: ChannelRegistry) -> Result<Self> {
        let upstream = UpstreamClient::new(&config)?;

        Ok(Self {
            config: Arc::new(config),
            channels: Arc::new(channels),
            upstream,
            metrics: metrics::init(),
            started_at: Instant::now(),
        })
    }
}
