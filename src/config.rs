//! Configuration loader - YAML settings + .env secrets
//!
//! Every section is optional in the YAML file; anything left out falls back
//! to the built-in defaults (AQI bands, traffic levels, 300 ms debounce,
//! 30 s ranking interval).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::quality::scale::ColorScale;
use crate::quality::BandTable;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration loaded from aqtraffic.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub air_bands: BandTable,
    pub traffic_bands: BandTable,
    pub color_scale: ColorScale,
    pub filter: FilterConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Quiescence window for map recomputation
    pub debounce_ms: u64,
    /// Autocomplete suggestion count
    pub search_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub interval_secs: u64,
    pub reverse: bool,
    /// Rows shown on the board
    pub top: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            air_bands: BandTable::air_default(),
            traffic_bands: BandTable::traffic_default(),
            color_scale: ColorScale::air_default(),
            filter: FilterConfig::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            search_limit: 5,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            reverse: true,
            top: 10,
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading config from {:?}", path);
            Self::load(path)
        } else {
            tracing::warn!("Config file not found: {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ranking.interval_secs == 0 {
            return Err(ConfigError::Invalid("ranking.interval_secs must be > 0".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Secrets override the file's API base URL
    pub fn apply_secrets(&mut self, secrets: &Secrets) {
        if let Some(url) = &secrets.api_base_url {
            self.api.base_url = url.clone();
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.filter.debounce_ms)
    }

    pub fn ranking_interval(&self) -> Duration {
        Duration::from_secs(self.ranking.interval_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

/// Secrets loaded from .env
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub log_dir: String,
}

impl Secrets {
    /// Load secrets from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Secrets {
            api_base_url: std::env::var("AQ_API_BASE_URL").ok(),
            api_token: std::env::var("AQ_API_TOKEN").ok(),
            log_dir: std::env::var("AQ_LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}
