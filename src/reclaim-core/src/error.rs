//! Core error types

use reclaim_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures that abort a whole sweep. Per-file failures never surface here.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("configuration unavailable: {0}")]
    Config(#[from] ConfigError),

    #[error("directory listing failed: {0}")]
    Listing(#[from] StoreError),
}
