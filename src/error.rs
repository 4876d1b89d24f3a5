//! Error types shared across the fetcher, reconciler and config loader.

use thiserror::Error;

/// Anything that makes a single status source unusable for this poll.
///
/// Every variant is recoverable: the fetcher moves on to the next source,
/// and only surfaces the last message once all sources are exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, TLS error or timeout.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },

    #[error("malformed response: {0}")]
    Malformed(String),

    /// The API answered but reported an error of its own.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Network(e) if e.is_timeout())
    }
}

/// Failures from the renameable display surface (the voice channel).
///
/// These are logged and swallowed; they never touch reconciliation state.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("discord rejected the request: {0}")]
    Discord(#[from] serenity::Error),

    #[error("channel {0} not found")]
    NotFound(u64),

    #[error("channel {0} is not a guild channel")]
    NotAGuildChannel(u64),

    #[error("timed out waiting for discord")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
