//! Video and metadata types

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// One recorded video in a storage root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    /// Full path to the video, unique within the storage root
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Recording time parsed from the file name, if it carries one
    pub recorded_at: Option<NaiveDateTime>,
}

impl VideoFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            recorded_at: None,
        }
    }

    /// File-name component, used in logs and reports
    pub fn name(&self) -> String {
        display_name(&self.path)
    }
}

/// Metadata sidecar for a video.
///
/// Fields are read leniently: a value of the wrong type (`"protected": null`,
/// `"duration": "12:30"`) falls back to the default instead of failing the
/// whole record. Only `"protected": true` marks a video as protected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Protected videos are never evicted for space
    #[serde(default, deserialize_with = "lenient")]
    pub protected: bool,

    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,

    /// Duration in seconds
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<f64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Result of a single delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_defaults_to_false() {
        let meta: VideoMetadata = serde_json::from_str(r#"{"category": "Arena"}"#).unwrap();
        assert!(!meta.protected);
        assert_eq!(meta.category.as_deref(), Some("Arena"));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let meta: VideoMetadata =
            serde_json::from_str(r#"{"protected": true, "zone": 2, "player": {"name": "x"}}"#)
                .unwrap();
        assert!(meta.protected);
    }

    #[test]
    fn test_mistyped_fields_fall_back_to_defaults() {
        let meta: VideoMetadata =
            serde_json::from_str(r#"{"protected": true, "duration": "12:30", "category": 7}"#)
                .unwrap();
        assert!(meta.protected);
        assert_eq!(meta.duration, None);
        assert_eq!(meta.category, None);

        let meta: VideoMetadata = serde_json::from_str(r#"{"protected": null}"#).unwrap();
        assert!(!meta.protected);

        let meta: VideoMetadata = serde_json::from_str(r#"{"protected": "yes"}"#).unwrap();
        assert!(!meta.protected);
    }

    #[test]
    fn test_name_is_file_component() {
        let video = VideoFile::new("/videos/2024-01-01 10-00-00 - run.mp4", 10);
        assert_eq!(video.name(), "2024-01-01 10-00-00 - run.mp4");
    }
}
