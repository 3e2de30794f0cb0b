pub mod model;
pub mod nickname;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use model::{AppConfig, LoggingConfig};

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crabbot")
        .join("config.toml")
}

/// Load the config at `path`, or defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).with_context(|| "Failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("crabbot-test-missing").join("config.toml");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.host, "irc.libera.chat");
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("crabbot-test-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.user.nickname = "Crab".into();
        cfg.admins = vec!["alice".into()];
        save_config(&path, &cfg).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.user.nickname, "Crab");
        assert_eq!(loaded.admins, vec!["alice".to_string()]);

        std::fs::write(&path, "debug = [").unwrap();
        assert!(load_config(&path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
