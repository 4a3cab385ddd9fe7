//! Storage access seams used by the eviction engine

use async_trait::async_trait;
use std::path::Path;

use crate::error::StoreError;
use crate::schema::{DeleteOutcome, VideoFile, VideoMetadata};

/// Lists the videos in a storage root.
///
/// Implementations must return videos ordered oldest-to-newest by recording
/// time. The eviction engine trusts this order and never re-sorts.
#[async_trait]
pub trait VideoLister: Send + Sync {
    async fn list_videos(&self, storage_root: &Path) -> Result<Vec<VideoFile>, StoreError>;
}

/// Reads the metadata attached to a video
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn metadata(&self, video: &VideoFile) -> Result<VideoMetadata, StoreError>;
}

/// Deletes a video together with its side files.
///
/// Deleting a video that is already gone returns `DeleteOutcome::AlreadyAbsent`,
/// not an error.
#[async_trait]
pub trait VideoDeleter: Send + Sync {
    async fn delete(&self, video: &VideoFile) -> Result<DeleteOutcome, StoreError>;
}

/// Everything a sweep needs from storage
pub trait VideoStore: VideoLister + MetadataSource + VideoDeleter {}

impl<T: VideoLister + MetadataSource + VideoDeleter> VideoStore for T {}
