//! User configuration
//!
//! Loaded from `$XDG_CONFIG_HOME/tt/config.toml` (or `$TT_CONFIG`). Every
//! field has a default, so a missing file or a partial one is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracker::TrackerSettings;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "TT_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub watches: WatchesConfig,
    pub intervals: IntervalsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Journal, lock, and logs (default: `$XDG_DATA_HOME/tt`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// IPC socket (default: `<data_dir>/tt.sock`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,

    /// Tries to open the journal before giving up
    pub store_open_attempts: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            socket_path: None,
            store_open_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchesConfig {
    pub max_watches: usize,
    pub sync_interval_secs: u64,
    pub tick_flush_secs: u64,
    pub quiet_period_secs: u64,
    pub poll_interval_ms: u64,
    /// Gitignore-style patterns skipped under every watch
    pub ignore_patterns: Vec<String>,
}

impl Default for WatchesConfig {
    fn default() -> Self {
        Self {
            max_watches: 4,
            sync_interval_secs: 3,
            tick_flush_secs: 3,
            quiet_period_secs: 10,
            poll_interval_ms: 1000,
            ignore_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalsConfig {
    /// Longest gap between ticks that still counts as one interval
    pub max_event_gap_secs: u64,
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            max_event_gap_secs: 23 * 60,
        }
    }
}

impl Config {
    /// Check every value is in its valid range
    pub fn validate(&self) -> Result<()> {
        check_range("daemon.store_open_attempts", self.daemon.store_open_attempts as u64, 1, 20)?;
        check_range("watches.max_watches", self.watches.max_watches as u64, 1, 64)?;
        check_range("watches.sync_interval_secs", self.watches.sync_interval_secs, 1, 3600)?;
        check_range("watches.tick_flush_secs", self.watches.tick_flush_secs, 1, 3600)?;
        check_range("watches.quiet_period_secs", self.watches.quiet_period_secs, 0, 3600)?;
        check_range("watches.poll_interval_ms", self.watches.poll_interval_ms, 10, 60_000)?;
        check_range("intervals.max_event_gap_secs", self.intervals.max_event_gap_secs, 60, 86_400)?;
        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.daemon.data_dir {
            Some(dir) => expand_home(dir),
            None => dirs::data_dir()
                .map(|dir| dir.join("tt"))
                .context("Could not determine data directory; set daemon.data_dir"),
        }
    }

    pub fn socket_path(&self) -> Result<PathBuf> {
        match &self.daemon.socket_path {
            Some(path) => expand_home(path),
            None => Ok(self.data_dir()?.join("tt.sock")),
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            max_watches: self.watches.max_watches,
            sync_interval: Duration::from_secs(self.watches.sync_interval_secs),
            tick_flush_interval: Duration::from_secs(self.watches.tick_flush_secs),
            quiet_period: Duration::from_secs(self.watches.quiet_period_secs),
            poll_interval: Duration::from_millis(self.watches.poll_interval_ms),
            max_event_gap: Duration::from_secs(self.intervals.max_event_gap_secs),
            ignore_patterns: self.watches.ignore_patterns.clone(),
        }
    }
}

fn check_range(key: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if !(min..=max).contains(&value) {
        anyhow::bail!("{} = {} is out of range ({}-{})", key, value, min, max);
    }
    Ok(())
}

/// Replace a leading `~` with the home directory
fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().context("Could not determine home directory")?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

/// Location of the config file
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("tt").join("config.toml"))
}

/// Load the config file, falling back to defaults if there is none
pub fn load() -> Result<Config> {
    match config_file_path() {
        Some(path) if path.exists() => load_from(&path),
        _ => Ok(Config::default()),
    }
}

pub fn load_from(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}
