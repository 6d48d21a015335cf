use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Request-scoped failures of the proxy.
///
/// Each variant maps to a distinct client-visible outcome. None of them is
/// retried and none leaves shared state behind.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Unknown channel key. Resolved locally, upstream is never contacted.
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// Upstream answered with a non-2xx status.
    #[error("Upstream returned {status}: {reason}")]
    UpstreamStatus { status: StatusCode, reason: String },

    /// Upstream unreachable, timed out or reset the connection.
    #[error("Upstream request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Request path cannot be mapped onto the channel base.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Startup configuration error (bad env var, bad channel file).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProxyError {
    /// Client-facing status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::ChannelNotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::UpstreamStatus { status, .. } => *status,
            ProxyError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            ProxyError::Network(_) | ProxyError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Keep bodies short and generic: never echo upstream URLs to clients.
        let body = match &self {
            ProxyError::ChannelNotFound(_) => "Channel not found\n".to_string(),
            ProxyError::UpstreamStatus { status, reason } => {
                format!("Upstream error: {} {}\n", status.as_u16(), reason)
            }
            ProxyError::InvalidPath(_) => "Invalid path\n".to_string(),
            ProxyError::Network(_) | ProxyError::Config(_) => {
                "Failed to fetch stream from upstream\n".to_string()
            }
        };

        (status, body).into_response()
    }
}
