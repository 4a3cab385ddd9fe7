//! Read-only storage usage summary

use futures::future::join_all;
use reclaim_store::{MetadataSource, StoreError, VideoFile, VideoLister};

use crate::config::QuotaSnapshot;
use crate::evictor::{select_for_eviction, Class};

/// Storage usage for a root, classified the same way a sweep would
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageReport {
    pub total_files: usize,
    pub total_bytes: u64,
    pub protected_files: usize,
    pub protected_bytes: u64,
    pub unprotected_files: usize,
    pub unprotected_bytes: u64,
    /// Recordings whose metadata cannot be read
    pub unreadable_files: usize,
    pub unreadable_bytes: u64,
    /// Recordings the next sweep would evict for space
    pub over_quota_files: usize,
    pub max_bytes: u64,
}

impl UsageReport {
    /// Bytes still available to unprotected recordings, `None` when unlimited
    pub fn headroom(&self) -> Option<u64> {
        if self.max_bytes == 0 {
            None
        } else {
            Some(self.max_bytes.saturating_sub(self.unprotected_bytes))
        }
    }
}

/// Compute usage without deleting anything
pub async fn usage<S>(store: &S, quota: &QuotaSnapshot) -> Result<UsageReport, StoreError>
where
    S: VideoLister + MetadataSource + ?Sized,
{
    let videos = store.list_videos(&quota.storage_root).await?;
    let metadata = join_all(videos.iter().map(|video| store.metadata(video))).await;

    let mut report = UsageReport {
        max_bytes: quota.max_bytes,
        ..UsageReport::default()
    };
    let mut unprotected: Vec<&VideoFile> = Vec::new();

    for (video, meta) in videos.iter().zip(&metadata) {
        report.total_files += 1;
        report.total_bytes += video.size;
        match Class::of(meta) {
            Class::Protected => {
                report.protected_files += 1;
                report.protected_bytes += video.size;
            }
            Class::Unprotected => {
                report.unprotected_files += 1;
                report.unprotected_bytes += video.size;
                unprotected.push(video);
            }
            Class::Corrupt => {
                report.unreadable_files += 1;
                report.unreadable_bytes += video.size;
            }
        }
    }

    if !quota.is_unlimited() {
        report.over_quota_files = select_for_eviction(unprotected, quota.max_bytes).len();
    }

    Ok(report)
}
