use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::system::CollectOptions;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub disk: DiskConfig,
    pub thresholds: ThresholdsConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub period_ms: u64,
    pub command_timeout_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            period_ms: 1000,
            command_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    pub path: PathBuf,
    pub reserved_tolerance_percent: f64,
}

impl Default for DiskConfig {
    fn default() -> Self {
        DiskConfig {
            path: PathBuf::from("/"),
            reserved_tolerance_percent: 10.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// The run fails when more than this many core metrics are unavailable.
    pub max_unavailable_core_metrics: usize,
    pub warn_percent: f64,
    pub critical_percent: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        ThresholdsConfig {
            max_unavailable_core_metrics: 2,
            warn_percent: 70.0,
            critical_percent: 90.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// auto, always or never
    pub color: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            color: "auto".to_string(),
        }
    }
}

impl Config {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.sampling.command_timeout_ms)
    }

    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            period: Duration::from_millis(self.sampling.period_ms),
            disk_path: self.disk.path.clone(),
            reserved_tolerance_percent: self.disk.reserved_tolerance_percent,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("perfsnap").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "config unreadable, using defaults");
            return Config::default();
        }
    };
    toml::from_str(&contents).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "config invalid, using defaults");
        Config::default()
    })
}
