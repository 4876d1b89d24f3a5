//! Runtime configuration, read from the environment (and `.env`).

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_PRIMARY_URL: &str = "https://mcapi.us/server/status";
pub const DEFAULT_SECONDARY_URL: &str = "https://api.mcsrvstat.us/2";

const MIN_POLL_MINUTES: u64 = 1;
const MIN_COOLDOWN_MINUTES: u64 = 10;
/// One week. Longer intervals are almost certainly a typo.
const MAX_POLL_MINUTES: u64 = 7 * 24 * 60;

/// Which rename candidates the cooldown applies to.
///
/// `PlayersOnly` keeps offline/error names immediate, so an outage shows
/// up in the channel name without waiting out the cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CooldownScope {
    #[default]
    PlayersOnly,
    All,
}

impl std::str::FromStr for CooldownScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "players" | "players-only" | "players_only" => Ok(Self::PlayersOnly),
            "all" => Ok(Self::All),
            other => Err(format!("expected `players` or `all`, got `{other}`")),
        }
    }
}

/// Base URLs for the two status APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEndpoints {
    pub primary: String,
    pub secondary: String,
}

impl Default for StatusEndpoints {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_URL.to_string(),
            secondary: DEFAULT_SECONDARY_URL.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    /// `host[:port]` of the game server.
    pub server_address: String,
    pub auth_token: String,
    /// Voice channel to rename. `None` disables every rename.
    pub display_surface_id: Option<u64>,
    /// Configured frequency, before the polling/cooldown floors apply.
    pub poll_frequency_minutes: u64,
    pub cooldown_scope: CooldownScope,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub endpoints: StatusEndpoints,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_address", &self.server_address)
            .field("auth_token", &"<redacted>")
            .field("display_surface_id", &self.display_surface_id)
            .field("poll_frequency_minutes", &self.poll_frequency_minutes)
            .field("cooldown_scope", &self.cooldown_scope)
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl Config {
    /// Load from the process environment. Call `dotenv::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key/value lookup. Each setting also accepts
    /// the variable name used by older deployments.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, legacy: Option<&str>| -> Option<String> {
            lookup(key)
                .or_else(|| legacy.and_then(&lookup))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let server_address = get("SERVER_ADDRESS", Some("MC_SERVER_IP"))
            .ok_or(ConfigError::Missing("SERVER_ADDRESS"))?;
        validate_address(&server_address)?;

        let auth_token = get("AUTH_TOKEN", Some("DISCORD_TOKEN"))
            .ok_or(ConfigError::Missing("AUTH_TOKEN"))?;

        let display_surface_id = match get("DISPLAY_SURFACE_ID", Some("VOICE_CHANNEL_ID")) {
            Some(raw) => Some(parse_channel_id(&raw)?),
            None => None,
        };

        let poll_frequency_minutes = get("POLL_FREQUENCY_MINUTES", Some("MC_PING_FREQUENCY"))
            .map(|raw| parse_frequency(&raw))
            .transpose()?
            .unwrap_or(MIN_POLL_MINUTES);

        let cooldown_scope = match get("RENAME_COOLDOWN_SCOPE", None) {
            Some(raw) => raw.parse::<CooldownScope>().map_err(|reason| ConfigError::Invalid {
                key: "RENAME_COOLDOWN_SCOPE",
                reason,
            })?,
            None => CooldownScope::default(),
        };

        let request_timeout = match get("STATUS_TIMEOUT_SECS", None) {
            Some(raw) => Duration::from_secs(parse_u64("STATUS_TIMEOUT_SECS", &raw)?.max(1)),
            None => Duration::from_secs(5),
        };

        let shutdown_timeout = match get("SHUTDOWN_TIMEOUT_SECS", None) {
            Some(raw) => Duration::from_secs(parse_u64("SHUTDOWN_TIMEOUT_SECS", &raw)?.max(1)),
            None => Duration::from_secs(5),
        };

        let defaults = StatusEndpoints::default();
        let endpoints = StatusEndpoints {
            primary: get("STATUS_PRIMARY_URL", None).unwrap_or(defaults.primary),
            secondary: get("STATUS_SECONDARY_URL", None).unwrap_or(defaults.secondary),
        };

        Ok(Self {
            server_address,
            auth_token,
            display_surface_id,
            poll_frequency_minutes,
            cooldown_scope,
            request_timeout,
            shutdown_timeout,
            endpoints,
        })
    }

    /// Interval between polls, floored to one minute.
    pub fn poll_interval(&self) -> Duration {
        minutes(self.poll_frequency_minutes.max(MIN_POLL_MINUTES))
    }

    /// Minimum gap between "players online" renames, floored to ten minutes.
    pub fn rename_cooldown(&self) -> Duration {
        minutes(self.poll_frequency_minutes.max(MIN_COOLDOWN_MINUTES))
    }
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(60))
}

fn parse_frequency(raw: &str) -> Result<u64, ConfigError> {
    match parse_u64("POLL_FREQUENCY_MINUTES", raw)? {
        m if m > MAX_POLL_MINUTES => Err(ConfigError::Invalid {
            key: "POLL_FREQUENCY_MINUTES",
            reason: format!("{m} minutes is longer than the {MAX_POLL_MINUTES} minute maximum"),
        }),
        m => Ok(m),
    }
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("`{raw}` is not a non-negative integer ({e})"),
    })
}

fn parse_channel_id(raw: &str) -> Result<u64, ConfigError> {
    match parse_u64("DISPLAY_SURFACE_ID", raw)? {
        0 => Err(ConfigError::Invalid {
            key: "DISPLAY_SURFACE_ID",
            reason: "channel id must be non-zero".into(),
        }),
        id => Ok(id),
    }
}

fn validate_address(address: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key: "SERVER_ADDRESS",
        reason: reason.to_string(),
    };

    if address.contains(char::is_whitespace) || address.contains('/') {
        return Err(invalid("expected host[:port]"));
    }
    match address.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(invalid("host is empty"));
            }
            port.parse::<u16>()
                .map_err(|_| invalid("port must be a number between 0 and 65535"))?;
        }
        None if address.is_empty() => return Err(invalid("host is empty")),
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = load(&[("SERVER_ADDRESS", "play.example.com"), ("AUTH_TOKEN", "tok")]).unwrap();
        assert_eq!(cfg.server_address, "play.example.com");
        assert_eq!(cfg.display_surface_id, None);
        assert_eq!(cfg.poll_frequency_minutes, 1);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(60));
        assert_eq!(cfg.rename_cooldown(), Duration::from_secs(600));
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.cooldown_scope, CooldownScope::PlayersOnly);
        assert_eq!(cfg.endpoints, StatusEndpoints::default());
    }

    #[test]
    fn test_missing_required_keys() {
        let err = load(&[("AUTH_TOKEN", "tok")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SERVER_ADDRESS")));

        let err = load(&[("SERVER_ADDRESS", "mc.example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("AUTH_TOKEN")));
    }

    #[test]
    fn test_legacy_names_accepted() {
        let cfg = load(&[
            ("MC_SERVER_IP", "mc.example.com:25565"),
            ("DISCORD_TOKEN", "tok"),
            ("VOICE_CHANNEL_ID", "123456789012345678"),
            ("MC_PING_FREQUENCY", "15"),
        ])
        .unwrap();
        assert_eq!(cfg.server_address, "mc.example.com:25565");
        assert_eq!(cfg.display_surface_id, Some(123456789012345678));
        assert_eq!(cfg.poll_interval(), Duration::from_secs(15 * 60));
        assert_eq!(cfg.rename_cooldown(), Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_frequency_floors() {
        let cfg = load(&[
            ("SERVER_ADDRESS", "a"),
            ("AUTH_TOKEN", "t"),
            ("POLL_FREQUENCY_MINUTES", "0"),
        ])
        .unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(60));
        assert_eq!(cfg.rename_cooldown(), Duration::from_secs(600));
    }

    #[test]
    fn test_frequency_upper_bound() {
        let base = [("SERVER_ADDRESS", "a"), ("AUTH_TOKEN", "t")];

        let mut pairs = base.to_vec();
        pairs.push(("MC_PING_FREQUENCY", "18446744073709551615"));
        let err = load(&pairs).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "POLL_FREQUENCY_MINUTES", .. }));

        let mut pairs = base.to_vec();
        pairs.push(("POLL_FREQUENCY_MINUTES", "10081"));
        assert!(load(&pairs).is_err());

        let mut pairs = base.to_vec();
        pairs.push(("POLL_FREQUENCY_MINUTES", "10080"));
        let cfg = load(&pairs).unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(10080 * 60));
        assert_eq!(cfg.rename_cooldown(), Duration::from_secs(10080 * 60));

        assert_eq!(minutes(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_rejects_bad_values() {
        let base = [("SERVER_ADDRESS", "mc.example.com"), ("AUTH_TOKEN", "t")];

        let mut pairs = base.to_vec();
        pairs.push(("POLL_FREQUENCY_MINUTES", "soon"));
        let err = load(&pairs).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "POLL_FREQUENCY_MINUTES", .. }));

        let mut pairs = base.to_vec();
        pairs.push(("DISPLAY_SURFACE_ID", "0"));
        let err = load(&pairs).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DISPLAY_SURFACE_ID", .. }));

        let mut pairs = base.to_vec();
        pairs.push(("RENAME_COOLDOWN_SCOPE", "sometimes"));
        let err = load(&pairs).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "RENAME_COOLDOWN_SCOPE", .. }));

        for bad in ["mc.example.com:99999", ":25565", "http://mc.example.com", "mc example"] {
            let err = load(&[("SERVER_ADDRESS", bad), ("AUTH_TOKEN", "t")]).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "SERVER_ADDRESS", .. }), "{bad}");
        }
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let err = load(&[("SERVER_ADDRESS", "   "), ("AUTH_TOKEN", "t")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SERVER_ADDRESS")));
    }

    #[test]
    fn test_cooldown_scope_all() {
        let cfg = load(&[
            ("SERVER_ADDRESS", "a"),
            ("AUTH_TOKEN", "t"),
            ("RENAME_COOLDOWN_SCOPE", "ALL"),
        ])
        .unwrap();
        assert_eq!(cfg.cooldown_scope, CooldownScope::All);
    }

    #[test]
    fn test_debug_redacts_token() {
        let cfg = load(&[("SERVER_ADDRESS", "a"), ("AUTH_TOKEN", "super-secret")]).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
