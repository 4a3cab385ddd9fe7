//! Filesystem-backed video store
//!
//! Layout inside a storage root:
//! - `<stem>.mp4` (or `.mkv` / `.webm`): the recording
//! - `<stem>.json`: metadata sidecar
//! - `<stem>.png`: thumbnail, optional
//!
//! Recording names start with a `YYYY-MM-DD HH-MM-SS` timestamp, which defines
//! the oldest-to-newest order returned by [`FsVideoStore::list_videos`].

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::schema::{DeleteOutcome, VideoFile, VideoMetadata};
use crate::traits::{MetadataSource, VideoDeleter, VideoLister};

/// Extensions recognized as recordings
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H-%M-%S";
const TIMESTAMP_LEN: usize = 19;

/// Side files removed together with a recording
const SIDE_FILE_EXTENSIONS: &[&str] = &["json", "png"];

/// Video store over a plain directory
#[derive(Debug, Clone, Copy, Default)]
pub struct FsVideoStore;

impl FsVideoStore {
    pub fn new() -> Self {
        Self
    }

    /// Path of the metadata sidecar for a video
    pub fn metadata_path(video: &Path) -> PathBuf {
        video.with_extension("json")
    }

    /// Set or clear the protection flag, keeping every other metadata field.
    ///
    /// Creates the sidecar when the video has none.
    pub async fn set_protected(
        &self,
        video: &Path,
        protected: bool,
    ) -> Result<VideoMetadata, StoreError> {
        fs::metadata(video).await?;

        let meta_path = Self::metadata_path(video);
        let mut record = match fs::read_to_string(&meta_path).await {
            Ok(content) => serde_json::from_str::<serde_json::Value>(&content).map_err(|e| {
                StoreError::MetadataCorrupt {
                    path: meta_path.clone(),
                    message: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => serde_json::json!({}),
            Err(e) => return Err(e.into()),
        };

        let fields = record
            .as_object_mut()
            .ok_or_else(|| StoreError::MetadataCorrupt {
                path: meta_path.clone(),
                message: "metadata is not a JSON object".to_string(),
            })?;
        fields.insert("protected".to_string(), serde_json::Value::Bool(protected));

        fs::write(&meta_path, serde_json::to_vec_pretty(&record)?).await?;
        debug!("set protected={} on {:?}", protected, video);

        Ok(serde_json::from_value(record)?)
    }
}

/// Parse the recording time from a file name such as
/// `2024-03-01 21-14-05 - Dungeon.mp4`.
pub fn parse_recorded_at(file_name: &str) -> Option<NaiveDateTime> {
    let prefix = file_name.get(..TIMESTAMP_LEN)?;
    NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT).ok()
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Oldest first. Names without a timestamp sort before all timestamped ones,
/// ties are broken by path.
fn sort_oldest_first(videos: &mut [VideoFile]) {
    videos.sort_by(|a, b| {
        a.recorded_at
            .cmp(&b.recorded_at)
            .then_with(|| a.path.cmp(&b.path))
    });
}

#[async_trait]
impl VideoLister for FsVideoStore {
    async fn list_videos(&self, storage_root: &Path) -> Result<Vec<VideoFile>, StoreError> {
        let listing_error = |source| StoreError::Listing {
            path: storage_root.to_path_buf(),
            source,
        };

        let mut entries = fs::read_dir(storage_root).await.map_err(listing_error)?;
        let mut videos = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(listing_error)? {
            let path = entry.path();
            if !is_video(&path) {
                continue;
            }

            // A file can vanish between read_dir and stat
            let stat = match entry.metadata().await {
                Ok(stat) => stat,
                Err(e) => {
                    debug!("skipping {:?}: {}", path, e);
                    continue;
                }
            };
            if !stat.is_file() {
                continue;
            }

            let recorded_at = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_recorded_at);

            videos.push(VideoFile {
                path,
                size: stat.len(),
                recorded_at,
            });
        }

        sort_oldest_first(&mut videos);
        debug!("listed {} video(s) in {:?}", videos.len(), storage_root);
        Ok(videos)
    }
}

#[async_trait]
impl MetadataSource for FsVideoStore {
    async fn metadata(&self, video: &VideoFile) -> Result<VideoMetadata, StoreError> {
        let meta_path = Self::metadata_path(&video.path);

        let content = match fs::read_to_string(&meta_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::MetadataMissing(meta_path));
            }
            Err(e) => return Err(e.into()),
        };

        let record: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| StoreError::MetadataCorrupt {
                path: meta_path.clone(),
                message: e.to_string(),
            })?;
        if !record.is_object() {
            return Err(StoreError::MetadataCorrupt {
                path: meta_path,
                message: "metadata is not a JSON object".to_string(),
            });
        }

        Ok(serde_json::from_value(record)?)
    }
}

#[async_trait]
impl VideoDeleter for FsVideoStore {
    async fn delete(&self, video: &VideoFile) -> Result<DeleteOutcome, StoreError> {
        // Video first, side files after
        let outcome = match fs::remove_file(&video.path).await {
            Ok(()) => DeleteOutcome::Deleted,
            Err(e) if e.kind() == ErrorKind::NotFound => DeleteOutcome::AlreadyAbsent,
            Err(source) => {
                return Err(StoreError::Delete {
                    path: video.path.clone(),
                    source,
                });
            }
        };

        for ext in SIDE_FILE_EXTENSIONS {
            let side = video.path.with_extension(ext);
            match fs::remove_file(&side).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove side file {:?}: {}", side, e),
            }
        }

        Ok(outcome)
    }
}
