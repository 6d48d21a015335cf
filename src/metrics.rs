//! Prometheus metrics.
//!
//! Handlers record through the `metrics` facade; the exporter renders the
//! text exposition served on `/metrics`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the global Prometheus recorder once and return its handle.
///
/// Safe to call repeatedly (every router built in tests calls it). Returns
/// `None` if another recorder was installed first.
pub fn init() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Prometheus recorder not installed: {}", e);
                None
            }
        })
        .clone()
}

/// Count a finished request by tier and response status.
pub fn record_request(tier: &'static str, status: u16) {
    metrics::counter!(
        "hlsrelay_requests_total",
        "tier" => tier,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Observe time to response headers for a tier.
pub fn record_duration(tier: &'static str, start: Instant) {
    metrics::histogram!("hlsrelay_request_duration_seconds", "tier" => tier)
        .record(start.elapsed().as_secs_f64());
}

/// Count an upstream failure (non-2xx or transport) for a tier.
pub fn record_upstream_error(tier: &'static str) {
    metrics::counter!("hlsrelay_upstream_errors_total", "tier" => tier).increment(1);
}
