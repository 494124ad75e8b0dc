use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was read from - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub torn: TornConfig,

    #[serde(default)]
    pub ffscouter: FfScouterConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Channel alerts are posted to and commands are accepted from.
    #[serde(default)]
    pub channel_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TornConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Home faction. Attacks by members of this faction are ignored.
    #[serde(default)]
    pub faction_id: u64,
    /// Faction whose members' travel is tracked; 0 disables travel tracking.
    #[serde(default)]
    pub enemy_faction_id: u64,
    #[serde(default = "default_torn_base_url")]
    pub base_url: String,
}

fn default_torn_base_url() -> String {
    "https://api.torn.com".into()
}

impl Default for TornConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            faction_id: 0,
            enemy_faction_id: 0,
            base_url: default_torn_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfScouterConfig {
    /// Without a key, battle-stat estimates are simply left out of alerts.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ffscouter_base_url")]
    pub base_url: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_ffscouter_base_url() -> String {
    "https://ffscouter.com".into()
}

fn default_cache_ttl_secs() -> u64 {
    600
}

impl Default for FfScouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ffscouter_base_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Config {
    /// Rejects configs the process must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("DISCORD_TOKEN"));
        }
        if self.discord.channel_id == 0 {
            return Err(ConfigError::Missing("CHANNEL_ID"));
        }
        if self.torn.faction_id == 0 {
            return Err(ConfigError::Missing("FACTION_ID"));
        }
        if self
            .torn
            .api_key
            .as_deref()
            .is_none_or(|key| key.trim().is_empty())
        {
            return Err(ConfigError::Missing("TORN_API_KEY"));
        }
        Ok(())
    }

    pub fn travel_tracking_enabled(&self) -> bool {
        self.torn.enemy_faction_id != 0
    }
}

fn redact(secret: Option<&str>) -> &'static str {
    match secret {
        Some(value) if !value.trim().is_empty() => "set",
        _ => "not set",
    }
}

/// Summary printed by `retalwatch check`; never shows secret values.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "config file:       {}", self.config_path.display())?;
        writeln!(
            f,
            "discord token:     {}",
            redact(Some(self.discord.bot_token.as_str()))
        )?;
        writeln!(f, "alert channel:     {}", self.discord.channel_id)?;
        writeln!(f, "torn api key:      {}", redact(self.torn.api_key.as_deref()))?;
        writeln!(f, "home faction:      {}", self.torn.faction_id)?;
        if self.travel_tracking_enabled() {
            writeln!(f, "enemy faction:     {}", self.torn.enemy_faction_id)?;
        } else {
            writeln!(f, "enemy faction:     disabled")?;
        }
        writeln!(
            f,
            "ffscouter key:     {}",
            redact(self.ffscouter.api_key.as_deref())
        )?;
        write!(
            f,
            "poll interval:     {}s (timeout {}s)",
            self.watch.poll_interval_secs, self.watch.request_timeout_secs
        )
    }
}
