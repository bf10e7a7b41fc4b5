//! Construction-time configuration for the loader, the providers and the CLI.
//!
//! Resolution order: explicit TOML file, else `{config_dir}/datalab/config.toml`
//! when it exists, else defaults. `FRED_API_KEY` in the environment overrides
//! the file's key; CLI flags override both (applied by the caller).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the economic-data provider credential.
pub const FRED_API_KEY_ENV: &str = "FRED_API_KEY";

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root holding `raw/` and `processed/`.
    pub data_dir: PathBuf,
    /// Credential for the economic-indicator provider. Absent disables it.
    pub fred_api_key: Option<String>,
    /// Per-request timeout for both providers.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Scale open/high/low/close by the provider's adjusted close.
    pub auto_adjust: bool,
    pub yahoo_base_url: String,
    pub fred_base_url: String,
    pub log_level: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fred_api_key: None,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            auto_adjust: true,
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.into(),
            fred_base_url: DEFAULT_FRED_BASE_URL.into(),
            log_level: "info".into(),
        }
    }
}

impl DataConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default location of the user config file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("datalab").join("config.toml"))
    }

    /// Load from `explicit` if given, else the default path if it exists, else
    /// defaults. The environment credential is applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(std::env::var(FRED_API_KEY_ENV).ok());
        Ok(config)
    }

    /// Override the credential with a non-blank environment value.
    pub fn apply_env(&mut self, fred_api_key: Option<String>) {
        if let Some(key) = fred_api_key.filter(|k| !k.trim().is_empty()) {
            self.fred_api_key = Some(key);
        }
    }

    /// The credential, treating a blank string as absent.
    pub fn fred_api_key(&self) -> Option<&str> {
        self.fred_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
