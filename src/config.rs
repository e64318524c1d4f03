//! Configuration for a cart tracker process.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! cart_id = "cart_007"
//! backend_url = "http://ledger.local:8000"
//!
//! [tracker]
//! confidence_threshold = 0.4
//! stabilization_frames = 5
//!
//! [sync]
//! max_attempts = 3
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tracker::AssociationStrategy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Detection filtering, stabilization and eviction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Detections below this confidence are ignored entirely.
    pub confidence_threshold: f32,
    /// IoU a detection must exceed to match a tracked item.
    pub iou_threshold: f32,
    /// Matching observations needed before a candidate is confirmed.
    pub stabilization_frames: usize,
    /// Seconds without a match after which an item is evicted.
    pub removal_timeout_secs: f64,
    /// Process every n-th frame from the sensor.
    pub frame_skip: u32,
    pub association: AssociationStrategy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            iou_threshold: 0.5,
            stabilization_frames: 5,
            removal_timeout_secs: 3.0,
            frame_skip: 2,
            association: AssociationStrategy::FirstMatch,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("tracker.confidence_threshold", self.confidence_threshold)?;
        check_unit_interval("tracker.iou_threshold", self.iou_threshold)?;
        if self.stabilization_frames == 0 {
            return Err(ConfigError::Invalid(
                "tracker.stabilization_frames must be at least 1".to_string(),
            ));
        }
        check_seconds("tracker.removal_timeout_secs", self.removal_timeout_secs)?;
        if self.frame_skip == 0 {
            return Err(ConfigError::Invalid(
                "tracker.frame_skip must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ledger client retry and timeout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Hard cap on HTTP attempts per ledger call.
    pub max_attempts: u32,
    /// Delay after failed attempt n is `retry_base_delay_secs * n`.
    pub retry_base_delay_secs: f64,
    pub request_timeout_secs: f64,
    pub health_timeout_secs: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay_secs: 1.0,
            request_timeout_secs: 5.0,
            health_timeout_secs: 2.0,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "sync.max_attempts must be at least 1".to_string(),
            ));
        }
        check_seconds("sync.retry_base_delay_secs", self.retry_base_delay_secs)?;
        check_seconds("sync.request_timeout_secs", self.request_timeout_secs)?;
        check_seconds("sync.health_timeout_secs", self.health_timeout_secs)?;
        if self.request_timeout_secs == 0.0 || self.health_timeout_secs == 0.0 {
            return Err(ConfigError::Invalid(
                "sync timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Call only on a validated config; negative values panic in `Duration`.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_base_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.health_timeout_secs)
    }
}

/// Top-level process configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub cart_id: String,
    /// Base URL of the ledger service.
    pub backend_url: String,
    /// JSON file mapping detector labels to SKUs.
    pub catalog_path: PathBuf,
    pub log_level: String,
    /// Also write logs to `log_dir/cart_{cart_id}.log`.
    pub log_to_file: bool,
    pub log_dir: PathBuf,
    pub tracker: TrackerConfig,
    pub sync: SyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cart_id: "cart_001".to_string(),
            backend_url: "http://localhost:8000".to_string(),
            catalog_path: PathBuf::from("config/sku_map.json"),
            log_level: "info".to_string(),
            log_to_file: false,
            log_dir: PathBuf::from("logs"),
            tracker: TrackerConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parses and validates config from a TOML string.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(input).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.display().to_string();
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_str,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Per-cart log file, used when `log_to_file` is set.
    pub fn log_file_path(&self) -> PathBuf {
        self.log_dir.join(format!("cart_{}.log", self.cart_id))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cart_id.trim().is_empty() {
            return Err(ConfigError::Invalid("cart_id must not be empty".to_string()));
        }
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "backend_url must not be empty".to_string(),
            ));
        }
        self.tracker.validate()?;
        self.sync.validate()
    }
}

fn check_unit_interval(name: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

fn check_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{name} must be a non-negative number of seconds, got {value}"
        )));
    }
    Ok(())
}
