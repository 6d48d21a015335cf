use super::finish;
use crate::{
    error::Result,
    route::{Tier, channel_from_uri, relative_from_uri, resolve_upstream},
    server::state::AppState,
    upstream::UpstreamResponse,
};
use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, info};

const SEGMENT_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Relay a media segment (or key, init section, part) from upstream.
///
/// The body is streamed through chunk by chunk and never buffered.
pub async fn serve_segment(
    OriginalUri(uri): OriginalUri,
    State(state): State<AppState>,
) -> Response {
    let start = Instant::now();
    // Raw target only: the tail may carry escapes that are not UTF-8
    let channel = channel_from_uri(&uri, Tier::Segment).unwrap_or_default();
    let result = segment(&state, channel, &uri).await;
    finish(Tier::Segment, channel, start, result)
}

async fn segment(state: &AppState, key: &str, uri: &axum::http::Uri) -> Result<Response> {
    let channel = state.channels.resolve(key)?;
    let relative = relative_from_uri(uri, Tier::Segment)?;
    let url = resolve_upstream(channel, Tier::Segment, &relative)?;

    info!("Serving segment {} for {}", relative, key);

    let upstream = state.upstream.fetch_segment(&url, channel).await?;
    Ok(stream_response(upstream))
}

/// Build a streaming response from an upstream body.
pub(crate) fn stream_response(upstream: UpstreamResponse) -> Response {
    let mut headers = HeaderMap::new();

    let content_type = upstream
        .content_type()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(SEGMENT_CACHE_CONTROL),
    );
    if let Some(length) = upstream.content_length() {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    debug!(
        "Streaming upstream body ({})",
        upstream
            .content_length()
            .map(|l| format!("{} bytes", l))
            .unwrap_or_else(|| "chunked".to_string())
    );

    let body = Body::from_stream(upstream.into_body_stream());
    (StatusCode::OK, headers, body).into_response()
}
