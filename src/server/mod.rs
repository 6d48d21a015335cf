pub mod handlers;
pub mod state;

use crate::{channels::ChannelRegistry, config::Config, error};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    response::Response,
    routing::get,
};
use state::AppState;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Response header carrying the crate version
pub const VERSION_HEADER: &str = "x-hlsrelay-version";

/// Load the channel registry named by the configuration.
pub fn load_channels(config: &Config) -> error::Result<ChannelRegistry> {
    match &config.channels_file {
        Some(path) => ChannelRegistry::from_json_file(path),
        None => Ok(ChannelRegistry::builtin()),
    }
}

/// Build the router with all routes, without binding a listener.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .route(
            "/variant/{channel}/{*path}",
            get(handlers::variant::serve_variant),
        )
        .route(
            "/segment/{channel}/{*path}",
            get(handlers::segment::serve_segment),
        )
        // `/<channel>.m3u8` and the bare `/<channel>` form
        .route("/{manifest}", get(handlers::master::serve_master))
        .layer(middleware::map_response(add_version_header))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn add_version_header(mut response: Response) -> Response {
    response.headers_mut().insert(
        VERSION_HEADER,
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    let channels = load_channels(&config)?;
    info!(
        "Serving {} channel(s): {}",
        channels.len(),
        channels.keys().join(", ")
    );

    let state = AppState::new(config, channels)?;

    // The recorder is installed without an upkeep task of its own
    if let Some(handle) = state.metrics.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            loop {
                interval.tick().await;
                handle.run_upkeep();
            }
        });
    }

    let app = build_router(state);

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🚀 Proxy listening on http://{}", addr);

    // Start serving
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
