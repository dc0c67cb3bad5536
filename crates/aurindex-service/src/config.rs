//! Service configuration.
//!
//! Configuration is one YAML document. `${VAR}` references are substituted
//! from the environment on the raw text before parsing, so secrets never need
//! to live in the file; an unset variable leaves the reference untouched.
//! Index definitions deserialize straight into [`IndexConfig`] and are
//! re-validated after load, so a weight table that does not sum to 1 fails
//! startup rather than the first computation.
//!
//! ```yaml
//! intake:
//!   listen_addr: "127.0.0.1:7600"
//!   queue_capacity: 1024
//! storage:
//!   home: /var/lib/aurindex
//!   max_pool_size: 4
//! insights:
//!   enabled: true
//!   provider: openai
//!   model: gpt-4o-mini
//!   api_key: "${OPENAI_API_KEY}"
//!   timeout_secs: 30
//!   workers: 2
//!   queue_capacity: 64
//! indices:
//!   - name: GSOC
//!     base_level: 1000.0
//!     base_date: "2024-01-01"
//!     weights: { GOLD: 0.25, SILVER: 0.25, OIL: 0.20, BTC: 0.15, ETH: 0.15 }
//!     base_prices: { GOLD: 1800.0, SILVER: 23.0, OIL: 75.0, BTC: 20000.0, ETH: 1000.0 }
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use aurindex_core::domain::IndexConfig;
use aurindex_core::ValidationError;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7600";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid index '{name}': {source}")]
    InvalidIndex {
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("duplicate index name '{0}'")]
    DuplicateIndex(String),
}

/// Top-level service configuration. Every section is optional and falls back
/// to defaults; a missing `indices` list falls back to the canonical basket.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub intake: IntakeConfig,
    pub storage: StorageConfig,
    pub insights: InsightsConfig,
    pub indices: Vec<IndexConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            intake: IntakeConfig::default(),
            storage: StorageConfig::default(),
            insights: InsightsConfig::default(),
            indices: vec![IndexConfig::default_commodity_crypto()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// TCP address accepting newline-delimited JSON price messages.
    pub listen_addr: String,
    /// Frames buffered between the listener and the consumer.
    pub queue_capacity: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory override. Defaults to the warehouse home resolution
    /// (`AURINDEX_HOME`, then `~/.aurindex`).
    pub home: Option<PathBuf>,
    pub max_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            home: None,
            max_pool_size: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightProvider {
    /// Deterministic in-process model, no credentials required.
    Mock,
    /// OpenAI-compatible chat completions endpoint.
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub enabled: bool,
    pub provider: InsightProvider,
    pub model: String,
    /// Endpoint base override for self-hosted gateways.
    pub api_base: Option<String>,
    /// Explicit key; when absent the `OPENAI_API_KEY` environment variable
    /// applies.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl InsightsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: InsightProvider::Mock,
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            api_key: None,
            timeout_secs: 30,
            workers: 2,
            queue_capacity: 64,
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse a YAML document, after environment substitution, and validate
    /// every declared index.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let substituted = substitute_env_vars(raw);
        let mut config: Self = if substituted.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&substituted)?
        };

        if config.indices.is_empty() {
            config.indices.push(IndexConfig::default_commodity_crypto());
        }

        for (position, index) in config.indices.iter().enumerate() {
            index.validate().map_err(|source| ConfigError::InvalidIndex {
                name: index.name.clone(),
                source,
            })?;
            if config.indices[..position]
                .iter()
                .any(|other| other.name == index.name)
            {
                return Err(ConfigError::DuplicateIndex(index.name.clone()));
            }
        }

        Ok(config)
    }
}

/// Replace `${VAR}` references with environment values. Unset variables are
/// left as-is so the later failure names the reference instead of an empty
/// string.
pub fn substitute_env_vars(raw: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern must compile"));
    pattern
        .replace_all(raw, |captures: &regex::Captures<'_>| {
            std::env::var(&captures[1]).unwrap_or_else(|_| captures[0].to_string())
        })
        .into_owned()
}
