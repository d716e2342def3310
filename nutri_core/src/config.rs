//! Configuration file support for Nutri.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/nutri/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub plausibility: PlausibilityBounds,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Sane physiological range for body measurements.
///
/// Values outside the range are not rejected; they require the user to
/// confirm before a derived target is saved.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlausibilityBounds {
    #[serde(default = "default_min_height_cm")]
    pub min_height_cm: f64,

    #[serde(default = "default_max_height_cm")]
    pub max_height_cm: f64,

    #[serde(default = "default_min_weight_kg")]
    pub min_weight_kg: f64,

    #[serde(default = "default_max_weight_kg")]
    pub max_weight_kg: f64,
}

impl Default for PlausibilityBounds {
    fn default() -> Self {
        Self {
            min_height_cm: default_min_height_cm(),
            max_height_cm: default_max_height_cm(),
            min_weight_kg: default_min_weight_kg(),
            max_weight_kg: default_max_weight_kg(),
        }
    }
}

impl PlausibilityBounds {
    /// Whether converted measurements fall outside the sane range
    pub fn is_unrealistic(&self, height_cm: f64, weight_kg: f64) -> bool {
        height_cm < self.min_height_cm
            || height_cm > self.max_height_cm
            || weight_kg < self.min_weight_kg
            || weight_kg > self.max_weight_kg
    }

    fn validate(&self) -> Result<()> {
        let pairs = [
            ("height", self.min_height_cm, self.max_height_cm),
            ("weight", self.min_weight_kg, self.max_weight_kg),
        ];
        for (what, min, max) in pairs {
            if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min >= max {
                return Err(Error::Config(format!(
                    "plausibility {} bounds must satisfy 0 < min < max (got {}..{})",
                    what, min, max
                )));
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("nutri")
}

fn default_min_height_cm() -> f64 {
    100.0
}

fn default_max_height_cm() -> f64 {
    250.0
}

fn default_min_weight_kg() -> f64 {
    30.0
}

fn default_max_weight_kg() -> f64 {
    300.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.plausibility.validate()
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("nutri").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
