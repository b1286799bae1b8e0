use crate::core::dashboard::DEFAULT_REFRESH_INTERVAL;
use crate::providers::caching::{DEFAULT_RATE_TIMEOUT, DEFAULT_RATE_TTL};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackendConfig {
    pub base_url: String,
    /// Per-request timeout for asset and transaction calls
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RatesConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_rate_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            ttl_secs: default_ttl_secs(),
            timeout_secs: default_rate_timeout_secs(),
        }
    }
}

impl RatesConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Display currency every value is converted into
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_supported_currencies")]
    pub supported_currencies: Vec<String>,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_ttl_secs() -> u64 {
    DEFAULT_RATE_TTL.as_secs()
}

fn default_rate_timeout_secs() -> u64 {
    DEFAULT_RATE_TIMEOUT.as_secs()
}

fn default_user_id() -> String {
    "test_user_001".to_string()
}

fn default_currency() -> String {
    "CNY".to_string()
}

fn default_supported_currencies() -> Vec<String> {
    ["CNY", "USD", "HKD"].map(String::from).to_vec()
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_page_size() -> u32 {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            backend: BackendConfig {
                base_url: "http://localhost:5000".to_string(),
                timeout_secs: default_request_timeout_secs(),
            },
            user_id: default_user_id(),
            currency: default_currency(),
            supported_currencies: default_supported_currencies(),
            rates: RatesConfig::default(),
            refresh_interval_secs: default_refresh_interval_secs(),
            page_size: default_page_size(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("app", "fintree", "fintree")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            anyhow::bail!("backend.base_url must not be empty");
        }
        if self.user_id.trim().is_empty() {
            anyhow::bail!("user_id must not be empty");
        }
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}
