pub mod health;
pub mod master;
pub mod segment;
pub mod variant;

use crate::{error::ProxyError, metrics, route::Tier};
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::error;

/// Content type of every rewritten playlist
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

fn manifest_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Record metrics for a finished request and turn errors into responses.
fn finish(
    tier: Tier,
    channel: &str,
    start: Instant,
    result: Result<Response, ProxyError>,
) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ProxyError::Network(inner) => {
                    error!("Upstream fetch failed for {} ({}): {}", channel, tier, inner);
                    metrics::record_upstream_error(tier.as_str());
                }
                ProxyError::UpstreamStatus { .. } => {
                    metrics::record_upstream_error(tier.as_str());
                }
                _ => {}
            }
            e.into_response()
        }
    };

    metrics::record_request(tier.as_str(), response.status().as_u16());
    metrics::record_duration(tier.as_str(), start);
    response
}
