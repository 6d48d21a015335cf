//! Proxy routing tree and its inverse.
//!
//! A rewritten reference is `/<tier>/<channel>/<relative>` where `relative`
//! is relative to the channel base and already carries the channel's path
//! prefix. Resolving it back is therefore `base + relative`, which equals
//! `base + prefix + rest` for every reference the rewrite engine emits.

use crate::channels::ChannelDescriptor;
use crate::error::{ProxyError, Result};
use crate::hls::reference::dot_segment;
use axum::http::Uri;
use std::fmt;

/// Routing level of a proxy request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Master,
    Variant,
    Segment,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Master => "master",
            Tier::Variant => "variant",
            Tier::Segment => "segment",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a base-relative upstream path as a proxy-local path.
///
/// The master tier ignores `relative`: it always maps to `/<channel>.m3u8`.
pub fn proxy_path(tier: Tier, channel_key: &str, relative: &str) -> String {
    match tier {
        Tier::Master => format!("/{}.m3u8", channel_key),
        Tier::Variant | Tier::Segment => format!("/{}/{}/{}", tier, channel_key, relative),
    }
}

/// Compute the absolute upstream URL for a proxy request.
///
/// `relative` is used verbatim (query string and percent-encoding included).
///
/// # Errors
/// Returns [`ProxyError::InvalidPath`] for empty paths, host-absolute paths
/// and paths containing dot segments.
pub fn resolve_upstream(channel: &ChannelDescriptor, tier: Tier, relative: &str) -> Result<String> {
    match tier {
        Tier::Master => Ok(channel.master_url()),
        Tier::Variant | Tier::Segment => {
            validate_relative(relative)?;
            Ok(format!("{}{}", channel.base, relative))
        }
    }
}

/// Split a raw `/<tier>/<channel>/<tail>` path into channel key and tail.
fn split_target(path: &str, tier: Tier) -> Result<(&str, &str)> {
    path.strip_prefix('/')
        .and_then(|rest| rest.strip_prefix(tier.as_str()))
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|rest| rest.split_once('/'))
        .ok_or_else(|| ProxyError::InvalidPath(path.to_string()))
}

/// Channel key of a `/<tier>/<channel>/...` request target, taken from the
/// raw path. Keys are URL-safe, so no decoding is needed.
pub fn channel_from_uri(uri: &Uri, tier: Tier) -> Result<&str> {
    split_target(uri.path(), tier).map(|(channel, _)| channel)
}

/// Extract the raw relative path (plus query) from a `/<tier>/<channel>/...`
/// request target, without percent-decoding anything.
pub fn relative_from_uri(uri: &Uri, tier: Tier) -> Result<String> {
    let (_, tail) = split_target(uri.path(), tier)?;

    let mut relative = tail.to_string();
    if let Some(query) = uri.query() {
        relative.push('?');
        relative.push_str(query);
    }

    Ok(relative)
}

fn validate_relative(relative: &str) -> Result<()> {
    let path = relative
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    if path.is_empty() || path.starts_with('/') {
        return Err(ProxyError::InvalidPath(relative.to_string()));
    }

    if path.split('/').any(|s| dot_segment(s).is_some()) {
        return Err(ProxyError::InvalidPath(relative.to_string()));
    }

    Ok(())
}
