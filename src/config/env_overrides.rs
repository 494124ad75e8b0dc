use super::Config;
use crate::error::ConfigError;

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn id_var(key: &'static str) -> Result<Option<u64>, ConfigError> {
    non_empty_var(key)
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key,
                value: raw.clone(),
            })
        })
        .transpose()
}

impl Config {
    /// Environment wins over the config file. Ids that are present but not
    /// numeric are a startup error rather than being silently ignored.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(token) = non_empty_var("DISCORD_TOKEN") {
            // Tokens pasted from dashboards often keep their quotes.
            self.discord.bot_token = token.trim_matches('"').to_string();
        }

        if let Some(key) = non_empty_var("TORN_API_KEY") {
            self.torn.api_key = Some(key);
        }

        if let Some(key) = non_empty_var("FFSCOUTER_KEY") {
            self.ffscouter.api_key = Some(key);
        }

        if let Some(channel_id) = id_var("CHANNEL_ID")? {
            self.discord.channel_id = channel_id;
        }

        if let Some(faction_id) = id_var("FACTION_ID")? {
            self.torn.faction_id = faction_id;
        }

        if let Some(enemy_id) = id_var("ENEMY_FACTION_ID")? {
            self.torn.enemy_faction_id = enemy_id;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_env::ScopedEnv;
    use super::*;

    #[test]
    fn env_overrides_replace_file_values() {
        let env = ScopedEnv::clean();
        env.set("DISCORD_TOKEN", "  \"quoted-token\" ");
        env.set("CHANNEL_ID", "1234");
        env.set("FACTION_ID", "55");
        env.set("ENEMY_FACTION_ID", "66");
        env.set("TORN_API_KEY", "torn");
        env.set("FFSCOUTER_KEY", "ffs");

        let mut config = Config::default();
        config.discord.channel_id = 1;
        config.apply_env_overrides().unwrap();

        assert_eq!(config.discord.bot_token, "quoted-token");
        assert_eq!(config.discord.channel_id, 1234);
        assert_eq!(config.torn.faction_id, 55);
        assert_eq!(config.torn.enemy_faction_id, 66);
        assert_eq!(config.torn.api_key.as_deref(), Some("torn"));
        assert_eq!(config.ffscouter.api_key.as_deref(), Some("ffs"));
    }

    #[test]
    fn empty_env_keeps_file_values() {
        let env = ScopedEnv::clean();
        env.set("TORN_API_KEY", "   ");

        let mut config = Config::default();
        config.torn.api_key = Some("from-file".into());
        config.torn.faction_id = 9;
        config.apply_env_overrides().unwrap();

        assert_eq!(config.torn.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.torn.faction_id, 9);
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let env = ScopedEnv::clean();
        env.set("CHANNEL_ID", "general");

        let mut config = Config::default();
        let err = config.apply_env_overrides().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "CHANNEL_ID",
                ..
            }
        ));
    }
}
