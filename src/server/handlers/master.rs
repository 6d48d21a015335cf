use super::{finish, manifest_response};
use crate::{
    error::Result,
    hls::{RewriteContext, SubtitleMode, rewrite_manifest},
    route::{Tier, resolve_upstream},
    server::state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

/// Serve a channel's rewritten master playlist.
///
/// Accepts both `/<channel>.m3u8` and `/<channel>`. The `enable_subs` and
/// `disable_subs` query flags select the subtitle default.
pub async fn serve_master(
    Path(manifest): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    let start = Instant::now();
    let key = manifest.strip_suffix(".m3u8").unwrap_or(&manifest);
    let mode = SubtitleMode::from_flags(
        flag_set(&params, "enable_subs"),
        flag_set(&params, "disable_subs"),
    );

    let result = master_playlist(&state, key, mode).await;
    finish(Tier::Master, key, start, result)
}

async fn master_playlist(state: &AppState, key: &str, mode: SubtitleMode) -> Result<Response> {
    let channel = state.channels.resolve(key)?;
    let url = resolve_upstream(channel, Tier::Master, "")?;

    info!("Serving master playlist for {} (subtitles: {:?})", key, mode);

    let content = state
        .upstream
        .fetch_manifest(&url, channel)
        .await?
        .text()
        .await?;

    let rewritten = rewrite_manifest(&content, &RewriteContext::for_master(channel), mode);
    Ok(manifest_response(rewritten))
}

fn flag_set(params: &HashMap<String, String>, name: &str) -> bool {
    params
        .get(name)
        .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}
