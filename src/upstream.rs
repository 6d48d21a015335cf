//! Upstream fetcher.
//!
//! Every request carries the channel's spoofed `Origin` and `Referer` plus a
//! browser `User-Agent`, which is what header-gated origins check before
//! serving a stream. Failures are never retried: a failed fetch fails the
//! client request once.

use crate::channels::ChannelDescriptor;
use crate::config::Config;
use crate::error::{ProxyError, Result};
use axum::body::Bytes;
use axum::http::StatusCode;
use futures_util::Stream;
use reqwest::{Client, header};
use std::time::Duration;
use tracing::{debug, warn};

/// Shared HTTP client for upstream requests (connection pooled).
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: Client,
    user_agent: String,
    manifest_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .connect_timeout(config.upstream_connect_timeout)
            // Stall detection: also bounds segment streams without capping their size
            .read_timeout(config.upstream_read_timeout)
            .build()
            .map_err(|e| ProxyError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            manifest_timeout: config.upstream_timeout,
        })
    }

    /// Fetch a playlist. The whole request, body included, must finish
    /// within the configured manifest deadline.
    pub async fn fetch_manifest(
        &self,
        url: &str,
        channel: &ChannelDescriptor,
    ) -> Result<UpstreamResponse> {
        self.fetch(url, channel, Some(self.manifest_timeout)).await
    }

    /// Fetch a media segment for streaming. Only connect and read stalls
    /// are bounded.
    pub async fn fetch_segment(
        &self,
        url: &str,
        channel: &ChannelDescriptor,
    ) -> Result<UpstreamResponse> {
        self.fetch(url, channel, None).await
    }

    async fn fetch(
        &self,
        url: &str,
        channel: &ChannelDescriptor,
        deadline: Option<Duration>,
    ) -> Result<UpstreamResponse> {
        debug!("Fetching upstream {} for channel {}", url, channel.key);

        let mut request = self
            .client
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ORIGIN, &channel.origin)
            .header(header::REFERER, &channel.referer);
        if let Some(deadline) = deadline {
            request = request.timeout(deadline);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!(
                "Upstream returned {} for {} (channel {})",
                status, url, channel.key
            );
            return Err(ProxyError::UpstreamStatus {
                status,
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(UpstreamResponse { inner: response })
    }
}

/// Successful (2xx) upstream response, not yet consumed.
#[derive(Debug)]
pub struct UpstreamResponse {
    inner: reqwest::Response,
}

impl UpstreamResponse {
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Upstream `Content-Type`, if present and valid ASCII
    pub fn content_type(&self) -> Option<&str> {
        self.inner
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.inner.content_length()
    }

    /// Buffer the whole body and decode it as UTF-8.
    ///
    /// Decoding ignores any `charset` parameter: playlists are UTF-8 by
    /// definition. Invalid sequences are replaced rather than failing.
    pub async fn text(self) -> Result<String> {
        let bytes = self.inner.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Hand the body over as a live byte stream. Nothing is buffered beyond
    /// the chunk in flight.
    pub fn into_body_stream(self) -> impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static {
        self.inner.bytes_stream()
    }
}

/// `true` if a content type names an HLS playlist (or generic text).
pub fn is_playlist_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    matches!(
        mime.as_str(),
        "application/vnd.apple.mpegurl"
            | "application/x-mpegurl"
            | "audio/mpegurl"
            | "audio/x-mpegurl"
            | "text/plain"
    )
}
