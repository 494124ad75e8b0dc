//! Battle-stat estimates from FFScouter, memoized per player.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::FfScouterConfig;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    fetched_at: i64,
}

/// Thin FFScouter client: one target per request.
pub struct FfScouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FfScouterClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build FFScouter HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Human-readable estimate (e.g. `"1.2b"`) for one player.
    pub async fn fetch_estimate(&self, player_id: u64) -> Result<String> {
        let url = format!("{}/api/v1/get-stats", self.base_url);
        let target = player_id.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("targets", target.as_str())])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("send FFScouter request")?;

        let payload: Value = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("parse FFScouter response JSON")?;

        let first = payload
            .as_array()
            .context("FFScouter response is not a list")?
            .first()
            .context("FFScouter returned no entries")?;

        first
            .get("bs_estimate_human")
            .and_then(Value::as_str)
            .filter(|estimate| !estimate.is_empty())
            .map(str::to_string)
            .context("FFScouter entry has no bs_estimate_human")
    }
}

/// Shared by both watchers. Only successes are cached; an expired entry is
/// ignored and overwritten on the next successful fetch, never purged.
pub struct StatCache {
    client: Option<FfScouterClient>,
    ttl_secs: i64,
    entries: Mutex<HashMap<u64, CacheEntry>>,
}

impl StatCache {
    pub fn new(client: Option<FfScouterClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Builds the cache from config; no API key means lookups are disabled.
    pub fn from_config(config: &FfScouterConfig, timeout: Duration) -> Result<Self> {
        let client = match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                Some(FfScouterClient::new(&config.base_url, key, timeout)?)
            }
            _ => {
                tracing::info!("FFScouter key not configured; battle-stat estimates disabled");
                None
            }
        };
        Ok(Self::new(client, Duration::from_secs(config.cache_ttl_secs)))
    }

    pub fn disabled() -> Self {
        Self::new(None, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn estimate(&self, player_id: u64) -> Option<String> {
        self.estimate_at(player_id, chrono::Utc::now().timestamp())
            .await
    }

    /// Never fails: lookup problems are logged and read as "no estimate".
    pub async fn estimate_at(&self, player_id: u64, now: i64) -> Option<String> {
        let client = self.client.as_ref()?;
        if player_id == 0 {
            return None;
        }

        if let Some(entry) = self.entries.lock().await.get(&player_id)
            && now - entry.fetched_at < self.ttl_secs
        {
            return Some(entry.value.clone());
        }

        match client.fetch_estimate(player_id).await {
            Ok(value) => {
                self.entries.lock().await.insert(
                    player_id,
                    CacheEntry {
                        value: value.clone(),
                        fetched_at: now,
                    },
                );
                Some(value)
            }
            Err(error) => {
                tracing::warn!(player_id, "FFScouter lookup failed: {error:#}");
                None
            }
        }
    }
}
