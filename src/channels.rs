//! Static channel registry.
//!
//! Maps a channel key to the upstream addressing template used to reach it:
//! base URL, path prefix of the master playlist, master filename and the
//! `Origin`/`Referer` values the upstream expects from its web player.

use crate::error::{ProxyError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use url::Url;

/// Upstream addressing for one channel. Immutable once the registry is built.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChannelDescriptor {
    pub key: String,
    /// Absolute `http(s)` URL ending in `/`
    pub base: String,
    /// Directory of the master playlist under `base` (empty or ending in `/`)
    #[serde(default)]
    pub prefix: String,
    /// Master playlist filename under `base + prefix`
    pub manifest: String,
    pub origin: String,
    pub referer: String,
}

impl ChannelDescriptor {
    /// Full upstream URL of the master playlist
    pub fn master_url(&self) -> String {
        format!("{}{}{}", self.base, self.prefix, self.manifest)
    }

    /// Base-relative path of the master playlist
    pub fn master_path(&self) -> String {
        format!("{}{}", self.prefix, self.manifest)
    }

    /// Check the descriptor can produce valid upstream URLs.
    fn validate(&self) -> Result<()> {
        validate_key(&self.key)?;

        let base = Url::parse(&self.base).map_err(|e| {
            ProxyError::Config(format!("channel '{}': bad base URL: {}", self.key, e))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ProxyError::Config(format!(
                "channel '{}': base must be http(s)",
                self.key
            )));
        }
        if !self.base.ends_with('/') {
            return Err(ProxyError::Config(format!(
                "channel '{}': base must end with '/'",
                self.key
            )));
        }
        if !self.prefix.is_empty() && !self.prefix.ends_with('/') {
            return Err(ProxyError::Config(format!(
                "channel '{}': prefix must end with '/'",
                self.key
            )));
        }
        if self.manifest.is_empty() {
            return Err(ProxyError::Config(format!(
                "channel '{}': manifest filename is empty",
                self.key
            )));
        }

        Url::parse(&self.master_url()).map_err(|e| {
            ProxyError::Config(format!("channel '{}': bad master URL: {}", self.key, e))
        })?;

        Ok(())
    }
}

/// Keys taken by fixed routes (`/health`, `/metrics`) or tier prefixes
pub const RESERVED_KEYS: &[&str] = &["health", "metrics", "variant", "segment"];

/// Keys go into proxy paths unescaped, so only URL-safe characters are
/// allowed. A key must not shadow a fixed route or end in `.m3u8`.
fn validate_key(key: &str) -> Result<()> {
    let url_safe = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    let dots_only = key.chars().all(|c| c == '.');

    if !url_safe || dots_only || key.ends_with(".m3u8") {
        return Err(ProxyError::Config(format!("invalid channel key '{}'", key)));
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(ProxyError::Config(format!(
            "channel key '{}' is reserved",
            key
        )));
    }

    Ok(())
}

/// Read-only lookup table of channels, shared across all requests.
#[derive(Clone, Debug)]
pub struct ChannelRegistry {
    channels: HashMap<String, ChannelDescriptor>,
}

impl ChannelRegistry {
    /// Build a registry, validating every descriptor and rejecting duplicates.
    pub fn new(descriptors: Vec<ChannelDescriptor>) -> Result<Self> {
        let mut channels = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            descriptor.validate()?;
            if channels.contains_key(&descriptor.key) {
                return Err(ProxyError::Config(format!(
                    "duplicate channel key '{}'",
                    descriptor.key
                )));
            }
            channels.insert(descriptor.key.clone(), descriptor);
        }

        Ok(Self { channels })
    }

    /// Channels shipped with the proxy
    pub fn builtin() -> Self {
        let channels = [
            ChannelDescriptor {
                key: "tudn".to_string(),
                base: "https://streaming-live-fcdn.api.prd.univisionnow.com/tudn/".to_string(),
                prefix: "tudn.isml/hls/".to_string(),
                manifest: "tudn.m3u8".to_string(),
                origin: "https://www.tudn.com".to_string(),
                referer: "https://www.tudn.com".to_string(),
            },
            ChannelDescriptor {
                key: "canal2".to_string(),
                base: "https://e3.thetvapp.to/".to_string(),
                prefix: "hls/espn-deportes/".to_string(),
                manifest: "index.m3u8".to_string(),
                origin: "https://e3.thetvapp.to".to_string(),
                referer: "https://e3.thetvapp.to".to_string(),
            },
        ];

        Self {
            channels: channels.into_iter().map(|c| (c.key.clone(), c)).collect(),
        }
    }

    /// Load a registry from a JSON array of channel descriptors.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let descriptors: Vec<ChannelDescriptor> = serde_json::from_str(&raw).map_err(|e| {
            ProxyError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;

        let registry = Self::new(descriptors)?;
        info!(
            "Loaded {} channel(s) from {}",
            registry.channels.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Look up a channel by exact key.
    pub fn resolve(&self, key: &str) -> Result<&ChannelDescriptor> {
        self.channels
            .get(key)
            .ok_or_else(|| ProxyError::ChannelNotFound(key.to_string()))
    }

    /// Sorted channel keys
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
