use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use canvalytics_eda::{ChartConfig, ProfileConfig};
use canvalytics_io::LoadConfig;
use canvalytics_pipeline::TrainingConfig;
use canvalytics_store::StoreConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "CANVALYTICS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// All settings, one TOML table per concern. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub load: LoadConfig,
    pub store: StoreConfig,
    pub profile: ProfileConfig,
    pub charts: ChartConfig,
    pub training: TrainingConfig,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, else from `$CANVALYTICS_CONFIG`. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            },
        };
        match fs::read_to_string(&path) {
            Ok(text) => {
                let config = Self::from_toml_str(&text)?;
                info!(path = %path.display(), "config loaded");
                Ok(config)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Config::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.training;
        if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "training.test_fraction must be in (0, 1), got {}",
                t.test_fraction
            )));
        }
        if self.charts.default_bins == 0 {
            return Err(ConfigError::Invalid("charts.default_bins must be at least 1".into()));
        }
        if self.load.max_bytes == 0 {
            return Err(ConfigError::Invalid("load.max_bytes must be positive".into()));
        }
        if self.store.max_datasets == Some(0) {
            return Err(ConfigError::Invalid("store.max_datasets must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [training]
            seed = 7

            [store]
            max_datasets = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.training.test_fraction, 0.2);
        assert_eq!(config.store.max_datasets, Some(3));
        assert_eq!(config.charts.default_bins, 20);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_toml_str("[training]\ntest_fraction = 1.5\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[charts]\ndefault_bins = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[training]\nseed = \"x\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }
}
