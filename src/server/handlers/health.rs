use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Plain-text index of the channels this proxy serves
pub async fn root(State(state): State<AppState>) -> String {
    let mut body = String::from("HLS relay is running. Channels:\n");
    for key in state.channels.keys() {
        body.push_str(&format!("  /{}.m3u8\n", key));
    }
    body
}

/// Liveness check with basic process info
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "channels": state.channels.len(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics recorder unavailable\n").into_response(),
    }
}
