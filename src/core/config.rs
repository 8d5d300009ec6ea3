use crate::core::quote_cache::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POOL_SIZE, DEFAULT_PRICE_FIELD, DEFAULT_TTL, RefreshPolicy,
};
use crate::core::retry::Backoff;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransactionConfig {
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub info: String,
    pub value: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AccountConfig {
    pub name: String,
    /// Falls back to the top-level currency.
    pub currency: Option<String>,
    #[serde(default)]
    pub category: u32,
    #[serde(default)]
    pub transactions: Vec<TransactionConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PositionConfig {
    pub symbol: String,
    pub currency: String,
    pub quantity: f64,
    /// Net cash flow of all trades; purchases are negative.
    #[serde(default)]
    pub proceeds: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_URL.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct QuotesConfig {
    pub ttl_secs: u64,
    pub max_attempts: usize,
    pub pool_size: usize,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub price_field: String,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        let backoff = Backoff::default();
        QuotesConfig {
            ttl_secs: DEFAULT_TTL.as_secs(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pool_size: DEFAULT_POOL_SIZE,
            backoff_ms: backoff.initial.as_millis() as u64,
            max_backoff_ms: backoff.max.as_millis() as u64,
            price_field: DEFAULT_PRICE_FIELD.to_string(),
        }
    }
}

impl QuotesConfig {
    pub fn to_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            ttl: Duration::from_secs(self.ttl_secs),
            max_attempts: self.max_attempts,
            backoff: Backoff {
                initial: Duration::from_millis(self.backoff_ms),
                max: Duration::from_millis(self.max_backoff_ms),
            },
            pool_size: self.pool_size,
            price_field: self.price_field.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub positions: Vec<PositionConfig>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub quotes: QuotesConfig,
    pub currency: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "ppfin", "ppfin")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_URL, |p| &p.base_url)
    }
}
