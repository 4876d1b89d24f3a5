//! Status fetcher: asks the public status APIs about one game server and
//! normalizes whatever they answer into a single [`ServerStatus`].
//!
//! Each API lives in its own adapter implementing [`StatusSource`]. The
//! fetcher tries them in order and never fails: if every source errors,
//! the caller gets [`PollOutcome::Unreachable`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::StatusEndpoints;
use crate::error::FetchError;

pub mod mcapi;
pub mod mcsrvstat;

/// Sentinel used when an API does not report a version or server name.
pub const UNKNOWN_VERSION: &str = "Unknown";

// ── Core Types ──────────────────────────────────────────────────────

/// Canonical server status, independent of which API answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub online: bool,
    pub player_count: u32,
    pub max_players: u32,
    pub player_names: Vec<String>,
    pub version: String,
}

impl ServerStatus {
    pub fn offline() -> Self {
        Self {
            online: false,
            player_count: 0,
            max_players: 0,
            player_names: Vec::new(),
            version: UNKNOWN_VERSION.to_string(),
        }
    }
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Success(ServerStatus),
    /// Every source failed; carries the last error message.
    Unreachable(String),
}

// ── Source Trait ────────────────────────────────────────────────────

/// One upstream status API.
///
/// Implementations own their response shape and must normalize it into
/// [`ServerStatus`] before returning.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Short identifier for logs (e.g. "mcapi").
    fn name(&self) -> &str;

    async fn query(&self, address: &str) -> Result<ServerStatus, FetchError>;
}

/// Build the HTTP client shared by both adapters. The timeout bounds every
/// request, fallback included.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

// ── Fetcher ─────────────────────────────────────────────────────────

pub struct StatusFetcher {
    primary: Box<dyn StatusSource>,
    fallback: Box<dyn StatusSource>,
}

impl StatusFetcher {
    /// Fetcher against the public APIs: mcapi.us first, mcsrvstat.us as
    /// fallback.
    pub fn new(endpoints: &StatusEndpoints, timeout: Duration) -> Result<Self, FetchError> {
        let client = http_client(timeout)?;
        Ok(Self::with_sources(
            Box::new(mcapi::McApiSource::new(client.clone(), &endpoints.primary)),
            Box::new(mcsrvstat::McSrvStatSource::new(client, &endpoints.secondary)),
        ))
    }

    pub fn with_sources(primary: Box<dyn StatusSource>, fallback: Box<dyn StatusSource>) -> Self {
        Self { primary, fallback }
    }

    /// Poll the server. Trial-then-fallback:
    ///
    /// - primary answers online → done
    /// - primary fails → ask the fallback; if that fails too, `Unreachable`
    /// - primary says offline → confirm with the fallback, since the primary
    ///   caches aggressively; if the fallback fails, the offline answer stands
    pub async fn fetch(&self, address: &str) -> PollOutcome {
        let primary = self.primary.query(address).await;

        let offline_hint = match primary {
            Ok(status) if status.online => return PollOutcome::Success(status),
            Ok(status) => {
                debug!(
                    source = self.primary.name(),
                    "Primary reports offline — confirming with {}",
                    self.fallback.name()
                );
                Some(status)
            }
            Err(e) => {
                warn!(
                    source = self.primary.name(),
                    timeout = e.is_timeout(),
                    "⚠️ {} failed ({}), trying {}...",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                None
            }
        };

        match self.fallback.query(address).await {
            Ok(status) => PollOutcome::Success(status),
            Err(e) => {
                warn!(source = self.fallback.name(), "{} failed: {}", self.fallback.name(), e);
                match offline_hint {
                    Some(status) => PollOutcome::Success(status),
                    None => PollOutcome::Unreachable(e.to_string()),
                }
            }
        }
    }
}

/// Split `host[:port]` into its parts. Bracketed IPv6 literals keep their
/// brackets in the host.
pub(crate) fn split_address(address: &str) -> (&str, Option<u16>) {
    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && (!host.contains(':') || host.ends_with(']')) => {
            match port.parse::<u16>() {
                Ok(p) => (host, Some(p)),
                Err(_) => (address, None),
            }
        }
        _ => (address, None),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_primary_online_skips_fallback() {
        let fallback = Arc::new(ScriptedSource::failing("mcsrvstat", "should not be called"));
        let fetcher = StatusFetcher::with_sources(
            Box::new(ScriptedSource::ok("mcapi", online(5, 20, &["A", "B"]))),
            Box::new(Shared(fallback.clone())),
        );

        let outcome = fetcher.fetch("play.example.com").await;
        assert_eq!(outcome, PollOutcome::Success(online(5, 20, &["A", "B"])));
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_primary_uses_fallback() {
        let fetcher = StatusFetcher::with_sources(
            Box::new(ScriptedSource::failing("mcapi", "timed out")),
            Box::new(ScriptedSource::ok("mcsrvstat", online(3, 10, &[]))),
        );

        let outcome = fetcher.fetch("play.example.com").await;
        assert_eq!(outcome, PollOutcome::Success(online(3, 10, &[])));
    }

    #[tokio::test]
    async fn test_both_failing_is_unreachable() {
        let fetcher = StatusFetcher::with_sources(
            Box::new(ScriptedSource::failing("mcapi", "connection refused")),
            Box::new(ScriptedSource::failing("mcsrvstat", "dns failure")),
        );

        match fetcher.fetch("play.example.com").await {
            PollOutcome::Unreachable(msg) => assert!(msg.contains("dns failure"), "{msg}"),
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_primary_offline_confirmed_by_fallback() {
        let fallback = Arc::new(ScriptedSource::ok("mcsrvstat", online(1, 10, &["Steve"])));
        let fetcher = StatusFetcher::with_sources(
            Box::new(ScriptedSource::ok("mcapi", ServerStatus::offline())),
            Box::new(Shared(fallback.clone())),
        );

        let outcome = fetcher.fetch("play.example.com").await;
        assert_eq!(outcome, PollOutcome::Success(online(1, 10, &["Steve"])));
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_primary_offline_stands_when_fallback_fails() {
        let fetcher = StatusFetcher::with_sources(
            Box::new(ScriptedSource::ok("mcapi", ServerStatus::offline())),
            Box::new(ScriptedSource::failing("mcsrvstat", "502")),
        );

        let outcome = fetcher.fetch("play.example.com").await;
        assert_eq!(outcome, PollOutcome::Success(ServerStatus::offline()));
    }

    #[test]
    fn test_split_address() {
        assert_eq!(split_address("play.example.com"), ("play.example.com", None));
        assert_eq!(split_address("play.example.com:25566"), ("play.example.com", Some(25566)));
        assert_eq!(split_address("[::1]:25565"), ("[::1]", Some(25565)));
        assert_eq!(split_address("::1"), ("::1", None));
    }
}
