mod browser;

pub use browser::BrowserConfig;

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Result, YtotError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Browser connection
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Mount point detection loop
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Speed-burst sync protocol
    #[serde(default)]
    pub sync: SyncConfig,

    /// Association store
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Detection loop timing. Retries use a fixed interval, never a growing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Delay before the first probe after a page load
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Delay between two probes
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Retries after the first probe before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before probing again after an in-app navigation
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_retry_interval_ms() -> u64 {
    1500
}

fn default_max_attempts() -> u32 {
    15
}

fn default_settle_delay_ms() -> u64 {
    500
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            max_attempts: default_max_attempts(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl DetectionConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Playback rate during a catch-up burst
    #[serde(default = "default_burst_rate")]
    pub burst_rate: f64,

    /// Playback rate restored after a burst
    #[serde(default = "default_normal_rate")]
    pub normal_rate: f64,

    /// Length of a burst
    #[serde(default = "default_burst_ms")]
    pub burst_ms: u64,

    /// Period of automatic bursts
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// How long "Synced" stays on the status line
    #[serde(default = "default_status_clear_ms")]
    pub status_clear_ms: u64,
}

fn default_burst_rate() -> f64 {
    2.0
}

fn default_normal_rate() -> f64 {
    1.0
}

fn default_burst_ms() -> u64 {
    5000
}

fn default_interval_ms() -> u64 {
    10 * 60 * 1000
}

fn default_status_clear_ms() -> u64 {
    3000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            burst_rate: default_burst_rate(),
            normal_rate: default_normal_rate(),
            burst_ms: default_burst_ms(),
            interval_ms: default_interval_ms(),
            status_clear_ms: default_status_clear_ms(),
        }
    }
}

impl SyncConfig {
    pub fn burst(&self) -> Duration {
        Duration::from_millis(self.burst_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn status_clear(&self) -> Duration {
        Duration::from_millis(self.status_clear_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store file (defaults to the local data directory)
    pub path: Option<String>,
}

impl StorageConfig {
    /// Resolve the store file, expanding `~`
    pub fn store_path(&self) -> PathBuf {
        match self.path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => PathBuf::from(shellexpand::tilde(path).to_string()),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ytot")
                .join("store.json"),
        }
    }
}

impl Config {
    /// Load configuration from all sources (file, env, defaults)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration using a specific file as the TOML layer
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            // YTOT_SYNC__BURST_MS=4000 -> sync.burst_ms
            .merge(Env::prefixed("YTOT_").split("__"))
            .extract()
            .map_err(|e| YtotError::ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ytot")
            .join("config.toml")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| YtotError::ConfigError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sync.burst_rate > 0.0 && self.sync.normal_rate > 0.0) {
            return Err(YtotError::ConfigError(
                "sync rates must be positive".to_string(),
            ));
        }
        if self.sync.interval_ms == 0 || self.detection.retry_interval_ms == 0 {
            return Err(YtotError::ConfigError(
                "intervals must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
