//! Run configuration.
//!
//! Values come from built-in defaults, optionally replaced by a JSON config
//! file, and finally by command-line flags.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR_NAME: &str = "aurcheck";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Tool that turns a build recipe into info-record text. The subject is
    /// appended as the final argument.
    pub producer_command: String,
    /// Package manager query tool.
    pub query_command: String,
    pub sync_db_dir: PathBuf,
    /// Root of the build-recipe tree used by the existence filter.
    pub recipe_root: PathBuf,
    pub jobs: usize,
    pub timeout_seconds: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            producer_command: "./introspect".to_string(),
            query_command: "pacman".to_string(),
            sync_db_dir: PathBuf::from("/var/lib/pacman/sync"),
            recipe_root: PathBuf::from("/var/abs"),
            jobs: 20,
            timeout_seconds: None,
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Default config location under the user's config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the config from `path`, or from the default location if that file
/// exists, or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|candidate| candidate.is_file()) {
            Some(candidate) => candidate,
            None => return Ok(Config::default()),
        },
    };
    let bytes = std::fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: Config = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.jobs == 0 {
        return Err(anyhow!("jobs must be at least 1"));
    }
    if config.producer_command.trim().is_empty() {
        return Err(anyhow!("producer_command must be non-empty"));
    }
    if config.query_command.trim().is_empty() {
        return Err(anyhow!("query_command must be non-empty"));
    }
    if config.timeout_seconds == Some(0) {
        return Err(anyhow!("timeout_seconds must be positive when set"));
    }
    Ok(())
}
