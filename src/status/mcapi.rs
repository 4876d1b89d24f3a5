//! mcapi.us adapter (primary). Fresher than mcsrvstat, but flakier.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{split_address, ServerStatus, StatusSource, UNKNOWN_VERSION};
use crate::error::FetchError;

#[derive(Debug, Deserialize)]
struct McApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    online: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    players: Option<McApiPlayers>,
    #[serde(default)]
    server: Option<McApiServer>,
}

#[derive(Debug, Deserialize)]
struct McApiPlayers {
    #[serde(default)]
    now: Option<u32>,
    #[serde(default)]
    max: Option<u32>,
    #[serde(default)]
    sample: Option<Vec<McApiSample>>,
}

#[derive(Debug, Deserialize)]
struct McApiSample {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct McApiServer {
    #[serde(default)]
    name: Option<String>,
}

pub struct McApiSource {
    client: reqwest::Client,
    base_url: String,
}

impl McApiSource {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl StatusSource for McApiSource {
    fn name(&self) -> &str {
        "mcapi"
    }

    async fn query(&self, address: &str) -> Result<ServerStatus, FetchError> {
        let (host, port) = split_address(address);
        let mut request = self.client.get(&self.base_url).query(&[("ip", host)]);
        if let Some(port) = port {
            request = request.query(&[("port", port)]);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http { status: status.as_u16() });
        }

        let body = resp.text().await?;
        debug!(source = "mcapi", "📡 Response: {}", body);
        parse(&body)
    }
}

fn parse(body: &str) -> Result<ServerStatus, FetchError> {
    let resp: McApiResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    normalize(resp)
}

fn normalize(resp: McApiResponse) -> Result<ServerStatus, FetchError> {
    if resp.status.as_deref() == Some("error") {
        let reason = resp
            .error
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "mcapi reported an error".to_string());
        return Err(FetchError::Upstream(reason));
    }

    if resp.online != Some(true) {
        return Ok(ServerStatus::offline());
    }

    let (player_count, max_players, player_names) = match resp.players {
        Some(p) => (
            p.now.unwrap_or(0),
            p.max.unwrap_or(0),
            p.sample
                .unwrap_or_default()
                .into_iter()
                .filter_map(|s| s.name)
                .collect(),
        ),
        None => (0, 0, Vec::new()),
    };

    Ok(ServerStatus {
        online: true,
        player_count,
        max_players,
        player_names,
        version: resp
            .server
            .and_then(|s| s.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
    })
}
