//! Diagnostic logging setup.
//!
//! Installs a `tracing` subscriber. When file logging is enabled, output goes
//! to a daily file named `crabbot_<date>.log` in the configured log directory
//! (default: `~/.local/share/crabbot/logs/`); otherwise it goes to stderr.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the configured
/// level; `debug` forces debug output so raw frames show up.
pub fn init(config: &LoggingConfig, debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level(config, debug)))
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if config.enabled {
        let path = log_file_path(config, &chrono::Local::now().format("%Y-%m-%d").to_string());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

fn level(config: &LoggingConfig, debug: bool) -> String {
    if debug {
        "debug".to_string()
    } else {
        config.level.clone()
    }
}

/// `<log_dir>/crabbot_<date>.log`, with a leading `~` expanded.
pub fn log_file_path(config: &LoggingConfig, date: &str) -> PathBuf {
    expand_home(&config.log_dir).join(format!("crabbot_{}.log", date))
}

fn expand_home(dir: &str) -> PathBuf {
    match dir.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(dir),
        },
        None if dir == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(dir)),
        None => Path::new(dir).to_path_buf(),
    }
}
