//! Configuration file support for cablecalc.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/cablecalc/config.toml`.

use crate::catalog::Catalog;
use crate::compensation::REFERENCE_TEMP_C;
use crate::{ConductorSpec, Error, Result, RoundingPolicy, DEFAULT_MAX_DROP_PERCENT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub solver: SolverConfig,

    /// Extra conductors appended to the built-in catalog
    #[serde(default)]
    pub conductors: Vec<ConductorSpec>,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_presets_path")]
    pub presets_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            presets_path: default_presets_path(),
        }
    }
}

/// Values used when a calculation input is not given
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_temp_c")]
    pub temp_c: f64,

    #[serde(default = "default_num_cores")]
    pub num_cores: u32,

    #[serde(default = "default_max_drop_percent")]
    pub max_drop_percent: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            temp_c: default_temp_c(),
            num_cores: default_num_cores(),
            max_drop_percent: default_max_drop_percent(),
        }
    }
}

/// Core-count solver configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SolverConfig {
    #[serde(default)]
    pub rounding: RoundingPolicy,
}

// Default value functions
fn default_presets_path() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("cablecalc").join("presets.json")
}

fn default_temp_c() -> f64 {
    REFERENCE_TEMP_C
}

fn default_num_cores() -> u32 {
    1
}

fn default_max_drop_percent() -> f64 {
    DEFAULT_MAX_DROP_PERCENT
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
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

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("cablecalc").join("config.toml")
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

    /// Check that the default inputs are physical
    pub fn validate(&self) -> Result<()> {
        let defaults = &self.defaults;
        if !defaults.temp_c.is_finite() {
            return Err(Error::Config(format!(
                "defaults.temp_c must be finite, got {}",
                defaults.temp_c
            )));
        }
        if defaults.num_cores == 0 {
            return Err(Error::Config("defaults.num_cores must be at least 1".into()));
        }
        if !(0.0..=100.0).contains(&defaults.max_drop_percent) {
            return Err(Error::Config(format!(
                "defaults.max_drop_percent must be between 0 and 100, got {}",
                defaults.max_drop_percent
            )));
        }
        Ok(())
    }

    /// Build the catalog: built-in conductors plus any configured extras
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::with_extra(self.conductors.iter().cloned())
    }
}
