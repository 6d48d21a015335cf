use crate::error::{ProxyError, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Browser User-Agent sent upstream unless overridden
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// `User-Agent` attached to every upstream request
    pub user_agent: String,
    /// Whole-request deadline for playlist fetches
    pub upstream_timeout: Duration,
    /// TCP/TLS connect deadline for every upstream request
    pub upstream_connect_timeout: Duration,
    /// Maximum silence between body chunks (also applies to segment streams)
    pub upstream_read_timeout: Duration,
    /// Optional JSON file replacing the built-in channel registry
    pub channels_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            upstream_timeout: Duration::from_secs(20),
            upstream_connect_timeout: Duration::from_secs(10),
            upstream_read_timeout: Duration::from_secs(30),
            channels_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable is optional; unset variables fall back to the
    /// defaults. A set but unparsable value is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let port = parse_var("PORT", defaults.port)?;

        let user_agent = env::var("USER_AGENT")
            .ok()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or(defaults.user_agent);

        let upstream_timeout = secs_var("UPSTREAM_TIMEOUT_SECS", defaults.upstream_timeout)?;
        let upstream_connect_timeout = secs_var(
            "UPSTREAM_CONNECT_TIMEOUT_SECS",
            defaults.upstream_connect_timeout,
        )?;
        let upstream_read_timeout =
            secs_var("UPSTREAM_READ_TIMEOUT_SECS", defaults.upstream_read_timeout)?;

        let channels_file = env::var("CHANNELS_FILE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config {
            port,
            user_agent,
            upstream_timeout,
            upstream_connect_timeout,
            upstream_read_timeout,
            channels_file,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ProxyError::Config(format!("{} has an invalid value: '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

fn secs_var(name: &str, default: Duration) -> Result<Duration> {
    let secs: u64 = parse_var(name, default.as_secs())?;
    if secs == 0 {
        return Err(ProxyError::Config(format!("{} must be greater than 0", name)));
    }
    Ok(Duration::from_secs(secs))
}
