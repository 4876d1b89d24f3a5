//! api.mcsrvstat.us adapter (fallback).
//!
//! mcsrvstat caches responses for a few minutes; a timestamp query
//! parameter is appended to every request to bust intermediate caches.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::debug;

use super::{ServerStatus, StatusSource, UNKNOWN_VERSION};
use crate::error::FetchError;

#[derive(Debug, Deserialize)]
struct McSrvStatResponse {
    #[serde(default)]
    online: Option<bool>,
    #[serde(default)]
    players: Option<McSrvStatPlayers>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct McSrvStatPlayers {
    #[serde(default)]
    online: Option<u32>,
    #[serde(default)]
    max: Option<u32>,
    #[serde(default)]
    list: Option<Vec<ListedPlayer>>,
}

/// API v2 lists bare names, v3 lists `{name, uuid}` objects. Entries
/// without a usable name are skipped rather than failing the payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListedPlayer {
    Name(String),
    Entry {
        #[serde(default)]
        name: Option<String>,
    },
    Other(IgnoredAny),
}

impl ListedPlayer {
    fn into_name(self) -> Option<String> {
        match self {
            ListedPlayer::Name(name) | ListedPlayer::Entry { name: Some(name) } => Some(name),
            ListedPlayer::Entry { name: None } | ListedPlayer::Other(_) => None,
        }
    }
}

pub struct McSrvStatSource {
    client: reqwest::Client,
    base_url: String,
}

impl McSrvStatSource {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, address: &str) -> String {
        format!("{}/{}", self.base_url, address)
    }
}

#[async_trait]
impl StatusSource for McSrvStatSource {
    fn name(&self) -> &str {
        "mcsrvstat"
    }

    async fn query(&self, address: &str) -> Result<ServerStatus, FetchError> {
        let cache_buster = Utc::now().timestamp_millis().to_string();
        let resp = self
            .client
            .get(self.url(address))
            .query(&[("t", cache_buster)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http { status: status.as_u16() });
        }

        let body = resp.text().await?;
        debug!(source = "mcsrvstat", "📡 Response: {}", body);
        parse(&body)
    }
}

fn parse(body: &str) -> Result<ServerStatus, FetchError> {
    let resp: McSrvStatResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(normalize(resp))
}

fn normalize(resp: McSrvStatResponse) -> ServerStatus {
    if resp.online != Some(true) {
        return ServerStatus::offline();
    }

    let (player_count, max_players, player_names) = match resp.players {
        Some(p) => (
            p.online.unwrap_or(0),
            p.max.unwrap_or(0),
            p.list
                .unwrap_or_default()
                .into_iter()
                .filter_map(ListedPlayer::into_name)
                .collect(),
        ),
        None => (0, 0, Vec::new()),
    };

    ServerStatus {
        online: true,
        player_count,
        max_players,
        player_names,
        version: resp
            .version
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
    }
}
