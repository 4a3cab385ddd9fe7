//! Configuration management
//!
//! The config file is re-read at the start of every sweep, so edits take
//! effect on the next run without a restart.

use async_trait::async_trait;
use reclaim_store::BYTES_PER_GB;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

/// Reclaim configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the recordings
    #[serde(default = "default_storage_path", alias = "storagePath")]
    pub storage_path: PathBuf,

    /// Storage budget in GB for unprotected recordings (0 = unlimited)
    #[serde(default, alias = "maxStorage")]
    pub max_storage_gb: u64,

    /// Seconds between periodic sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Cancel a sweep that runs longer than this
    #[serde(default)]
    pub sweep_timeout_secs: Option<u64>,
}

fn default_storage_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Reclaim")
        .join("videos")
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_storage_gb: 0,
            sweep_interval_secs: default_sweep_interval(),
            sweep_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Reclaim")
            .join("config.toml")
    }

    pub fn apply(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(ref path) = overrides.storage_path {
            self.storage_path = path.clone();
        }
        if let Some(gb) = overrides.max_storage_gb {
            self.max_storage_gb = gb;
        }
        self
    }

    pub fn quota(&self) -> Result<QuotaSnapshot, ConfigError> {
        if self.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage_path is empty".to_string()));
        }
        Ok(QuotaSnapshot::from_gb(
            self.storage_path.clone(),
            self.max_storage_gb,
        ))
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub storage_path: Option<PathBuf>,
    pub max_storage_gb: Option<u64>,
}

/// Quota settings captured once per sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub storage_root: PathBuf,
    /// 0 means unlimited
    pub max_bytes: u64,
}

impl QuotaSnapshot {
    pub fn new(storage_root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            storage_root: storage_root.into(),
            max_bytes,
        }
    }

    pub fn from_gb(storage_root: impl Into<PathBuf>, max_gb: u64) -> Self {
        Self::new(storage_root, max_gb.saturating_mul(BYTES_PER_GB))
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_bytes == 0
    }
}

/// Supplies the quota for a sweep
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn snapshot(&self) -> Result<QuotaSnapshot, ConfigError>;
}

/// Reads the TOML file on every snapshot
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
    overrides: ConfigOverrides,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>, overrides: ConfigOverrides) -> Self {
        Self {
            path: path.into(),
            overrides,
        }
    }

    pub async fn load(&self) -> Result<Config, ConfigError> {
        Ok(Config::load(&self.path).await?.apply(&self.overrides))
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn snapshot(&self) -> Result<QuotaSnapshot, ConfigError> {
        self.load().await?.quota()
    }
}

/// Fixed quota, for embedding and tests
#[derive(Debug, Clone)]
pub struct StaticConfig(pub QuotaSnapshot);

#[async_trait]
impl ConfigSource for StaticConfig {
    async fn snapshot(&self) -> Result<QuotaSnapshot, ConfigError> {
        Ok(self.0.clone())
    }
}
