//! In-memory store and notifier for engine tests

use async_trait::async_trait;
use reclaim_store::{
    DeleteOutcome, MetadataSource, StoreError, VideoDeleter, VideoFile, VideoLister,
    VideoMetadata,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::evictor::SweepReport;
use crate::notifier::CompletionNotifier;

#[derive(Debug, Clone, Copy)]
enum Meta {
    Readable { protected: bool },
    Corrupt,
}

/// Store over a list of named videos, oldest first. Records every call.
#[derive(Default)]
pub struct MemoryStore {
    videos: Mutex<Vec<(VideoFile, Meta)>>,
    delays: Mutex<HashMap<PathBuf, Duration>>,
    failing_deletes: Mutex<HashSet<PathBuf>>,
    vanishing: Mutex<HashSet<PathBuf>>,
    cancel_hooks: Mutex<HashMap<PathBuf, CancellationToken>>,
    listing_fails: AtomicBool,
    list_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
    delete_calls: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a video as the newest one
    pub fn add(&self, name: &str, size: u64, protected: bool) {
        self.videos
            .lock()
            .unwrap()
            .push((VideoFile::new(name, size), Meta::Readable { protected }));
    }

    pub fn add_corrupt(&self, name: &str, size: u64) {
        self.videos
            .lock()
            .unwrap()
            .push((VideoFile::new(name, size), Meta::Corrupt));
    }

    pub fn delay_metadata(&self, name: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(PathBuf::from(name), delay);
    }

    pub fn fail_delete(&self, name: &str) {
        self.failing_deletes.lock().unwrap().insert(PathBuf::from(name));
    }

    /// Remove the video just before its delete runs, as another process might
    pub fn vanish_on_delete(&self, name: &str) {
        self.vanishing.lock().unwrap().insert(PathBuf::from(name));
    }

    /// Cancel `token` when the metadata of `name` is requested
    pub fn cancel_on_metadata(&self, name: &str, token: CancellationToken) {
        self.cancel_hooks
            .lock()
            .unwrap()
            .insert(PathBuf::from(name), token);
    }

    pub fn fail_listing(&self) {
        self.listing_fails.store(true, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().unwrap().clone()
    }

    /// Names actually removed by a delete call
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> Vec<String> {
        self.videos
            .lock()
            .unwrap()
            .iter()
            .map(|(video, _)| video.name())
            .collect()
    }

    /// Remaining videos with their protection flag
    pub fn remaining_files(&self) -> Vec<(VideoFile, bool)> {
        self.videos
            .lock()
            .unwrap()
            .iter()
            .map(|(video, meta)| {
                let protected = matches!(meta, Meta::Readable { protected: true });
                (video.clone(), protected)
            })
            .collect()
    }

    fn take(&self, path: &Path) -> bool {
        let mut videos = self.videos.lock().unwrap();
        let before = videos.len();
        videos.retain(|(video, _)| video.path != path);
        videos.len() != before
    }
}

#[async_trait]
impl VideoLister for MemoryStore {
    async fn list_videos(&self, storage_root: &Path) -> Result<Vec<VideoFile>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Listing {
                path: storage_root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(self
            .videos
            .lock()
            .unwrap()
            .iter()
            .map(|(video, _)| video.clone())
            .collect())
    }
}

#[async_trait]
impl MetadataSource for MemoryStore {
    async fn metadata(&self, video: &VideoFile) -> Result<VideoMetadata, StoreError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(&video.path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(token) = self.cancel_hooks.lock().unwrap().get(&video.path) {
            token.cancel();
        }

        let meta = self
            .videos
            .lock()
            .unwrap()
            .iter()
            .find(|(v, _)| v.path == video.path)
            .map(|(_, meta)| *meta);

        match meta {
            Some(Meta::Readable { protected }) => Ok(VideoMetadata {
                protected,
                ..VideoMetadata::default()
            }),
            Some(Meta::Corrupt) => Err(StoreError::MetadataCorrupt {
                path: video.path.clone(),
                message: "bad record".to_string(),
            }),
            None => Err(StoreError::MetadataMissing(video.path.clone())),
        }
    }
}

#[async_trait]
impl VideoDeleter for MemoryStore {
    async fn delete(&self, video: &VideoFile) -> Result<DeleteOutcome, StoreError> {
        self.delete_calls.lock().unwrap().push(video.name());

        if self.failing_deletes.lock().unwrap().contains(&video.path) {
            return Err(StoreError::Delete {
                path: video.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
            });
        }

        if self.vanishing.lock().unwrap().contains(&video.path) {
            self.take(&video.path);
        }

        if self.take(&video.path) {
            self.deleted.lock().unwrap().push(video.name());
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyAbsent)
        }
    }
}

/// Keeps every report it is given
#[derive(Default)]
pub struct RecordingNotifier {
    reports: Mutex<Vec<SweepReport>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn reports(&self) -> Vec<SweepReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl CompletionNotifier for RecordingNotifier {
    fn sweep_completed(&self, report: &SweepReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}
