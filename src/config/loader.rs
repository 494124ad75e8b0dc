use super::Config;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// `~/.retalwatch/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".retalwatch").join("config.toml"))
    }

    /// Loads the config file (optional), applies environment overrides and
    /// validates. Any failure here must stop the process before it starts.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config_path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = Self::read_file(&config_path, explicit_path.is_some())?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(config_path: &Path, required: bool) -> Result<Self> {
        if !config_path.exists() {
            if required {
                return Err(ConfigError::Load(format!(
                    "config file {} does not exist",
                    config_path.display()
                ))
                .into());
            }
            tracing::debug!(
                path = %config_path.display(),
                "no config file, using environment only"
            );
            return Ok(Self {
                config_path: config_path.to_path_buf(),
                ..Self::default()
            });
        }

        let contents = fs::read_to_string(config_path)
            .map_err(ConfigError::Io)
            .context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::Load(e.to_string()))
            .context("Failed to parse config file")?;
        config.config_path = config_path.to_path_buf();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_env::ScopedEnv;
    use super::*;
    use tempfile::TempDir;

    const VALID_TOML: &str = r#"
[discord]
bot_token = "file-token"
channel_id = 100

[torn]
api_key = "file-torn"
faction_id = 200
enemy_faction_id = 300

[watch]
poll_interval_secs = 30
"#;

    #[test]
    fn loads_and_validates_file() {
        let _env = ScopedEnv::clean();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, VALID_TOML).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.config_path, path);
        assert_eq!(config.discord.channel_id, 100);
        assert_eq!(config.torn.enemy_faction_id, 300);
        assert_eq!(config.watch.poll_interval_secs, 30);
        assert_eq!(config.watch.request_timeout_secs, 10);
    }

    #[test]
    fn env_overrides_file() {
        let env = ScopedEnv::clean();
        env.set("FACTION_ID", "999");
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, VALID_TOML).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.torn.faction_id, 999);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let _env = ScopedEnv::clean();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn incomplete_config_fails_validation() {
        let _env = ScopedEnv::clean();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[discord]\nbot_token = \"t\"\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>();
        assert!(matches!(config_err, Some(ConfigError::Missing("CHANNEL_ID"))));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let _env = ScopedEnv::clean();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[discord\nbot_token = ").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
