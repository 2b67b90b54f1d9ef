//! TOML-backed application configuration.
//!
//! Grounded in a `config.rs`-plus-CLI split: a serde
//! struct loaded from disk, overridable by environment and CLI flags before
//! the process starts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    pub inbound_topic: String,
    pub inbound_subscription: String,
    pub outbound_topic: String,
    pub outbound_subscription: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            inbound_topic: "ocpp-inbound".to_string(),
            inbound_subscription: "ocpp-bridge".to_string(),
            outbound_topic: "ocpp-outbound".to_string(),
            outbound_subscription: "ocpp-bridge".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub address: String,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            ttl_seconds: 86_400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub dsn: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite://ocpp-bridge.sqlite?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub receive_timeout_secs: u64,
    pub cache_timeout_secs: u64,
    pub store_timeout_secs: u64,
    pub send_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            receive_timeout_secs: 30,
            cache_timeout_secs: 5,
            store_timeout_secs: 5,
            send_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file. Missing sections fall back to
    /// their `Default` impl so a partial config file is valid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Default config path: `~/.config/ocpp-bridge/config.toml`, overridable via
/// the `OCPP_BRIDGE_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("OCPP_BRIDGE_CONFIG") {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ocpp-bridge")
        .join("config.toml")
}
