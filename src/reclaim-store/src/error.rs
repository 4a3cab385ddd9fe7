//! Store error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to list videos in {path:?}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata not found for {0:?}")]
    MetadataMissing(PathBuf),

    #[error("corrupt metadata for {path:?}: {message}")]
    MetadataCorrupt { path: PathBuf, message: String },

    #[error("failed to delete {path:?}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True for failures that mean the metadata record itself is unusable
    pub fn is_metadata_failure(&self) -> bool {
        matches!(
            self,
            StoreError::MetadataMissing(_) | StoreError::MetadataCorrupt { .. }
        )
    }
}
