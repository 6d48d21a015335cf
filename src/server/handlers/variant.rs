use super::{finish, manifest_response, segment::stream_response};
use crate::{
    error::Result,
    hls::{
        RewriteContext, SubtitleMode,
        reference::{ReferenceKind, classify_by_extension},
        rewrite_manifest,
    },
    route::{Tier, channel_from_uri, relative_from_uri, resolve_upstream},
    server::state::AppState,
    upstream::is_playlist_content_type,
};
use axum::{
    extract::{OriginalUri, State},
    http::Uri,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, info};

/// Serve a rewritten variant (media or rendition) playlist.
pub async fn serve_variant(
    OriginalUri(uri): OriginalUri,
    State(state): State<AppState>,
) -> Response {
    let start = Instant::now();
    // Raw target only: the tail may carry escapes that are not UTF-8
    let channel = channel_from_uri(&uri, Tier::Variant).unwrap_or_default();
    let result = variant_playlist(&state, channel, &uri).await;
    finish(Tier::Variant, channel, start, result)
}

async fn variant_playlist(state: &AppState, key: &str, uri: &Uri) -> Result<Response> {
    let channel = state.channels.resolve(key)?;
    let relative = relative_from_uri(uri, Tier::Variant)?;
    let url = resolve_upstream(channel, Tier::Variant, &relative)?;

    info!("Serving variant playlist {} for {}", relative, key);

    let upstream = state.upstream.fetch_manifest(&url, channel).await?;

    // Extensionless references are guessed from context; trust the origin
    // when it says the body is media.
    let binary = upstream
        .content_type()
        .is_some_and(|ct| !is_playlist_content_type(ct))
        && classify_by_extension(&relative) != Some(ReferenceKind::Playlist);
    if binary {
        debug!("Variant {} for {} is media, relaying as-is", relative, key);
        return Ok(stream_response(upstream));
    }

    let content = upstream.text().await?;
    let rewritten = rewrite_manifest(
        &content,
        &RewriteContext::for_document(channel, &relative),
        SubtitleMode::Unchanged,
    );
    Ok(manifest_response(rewritten))
}
