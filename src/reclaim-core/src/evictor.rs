//! Storage quota enforcement
//!
//! One sweep keeps the storage root within its quota:
//! 1. snapshot the quota (unlimited quota stops here)
//! 2. list recordings oldest-first
//! 3. fetch every recording's metadata concurrently; unreadable metadata gets
//!    the recording deleted on the spot
//! 4. walk the unprotected recordings oldest-first with a running byte total;
//!    from the first one that takes the total over the quota onwards, delete
//! 5. notify once

use futures::future::join_all;
use reclaim_store::{
    format_bytes, DeleteOutcome, StoreError, VideoFile, VideoMetadata, VideoStore,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ConfigSource;
use crate::error::SweepError;
use crate::notifier::CompletionNotifier;

/// What a sweep did, for logs and listeners
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// The quota was 0 and nothing was inspected
    pub unlimited: bool,
    /// Cancelled before finishing; deletions not yet started were skipped
    pub cancelled: bool,
    pub listed: usize,
    pub protected: usize,
    pub unprotected: usize,
    /// Removed because their metadata could not be read
    pub corrupt_removed: Vec<String>,
    /// Removed to bring usage under the quota
    pub evicted: Vec<String>,
    /// Deletions that failed; reconsidered on the next sweep
    pub failed: Vec<String>,
    /// Deletions not attempted because of cancellation
    pub skipped: usize,
    pub bytes_freed: u64,
}

impl SweepReport {
    pub fn deleted_count(&self) -> usize {
        self.corrupt_removed.len() + self.evicted.len()
    }
}

/// Protection status of one recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Protected,
    Unprotected,
    /// Metadata missing or unreadable
    Corrupt,
}

impl Class {
    pub fn of(metadata: &Result<VideoMetadata, StoreError>) -> Self {
        match metadata {
            Ok(meta) if meta.protected => Class::Protected,
            Ok(_) => Class::Unprotected,
            Err(_) => Class::Corrupt,
        }
    }
}

/// Pick the unprotected recordings to evict.
///
/// `unprotected` must be oldest-first. The running total includes the current
/// recording, and once it exceeds `max_bytes` every later recording is picked
/// too, since the total only grows.
pub fn select_for_eviction<'a, I>(unprotected: I, max_bytes: u64) -> Vec<&'a VideoFile>
where
    I: IntoIterator<Item = &'a VideoFile>,
{
    let mut total: u64 = 0;
    unprotected
        .into_iter()
        .filter(|video| {
            total = total.saturating_add(video.size);
            total > max_bytes
        })
        .collect()
}

/// Outcome of one delete request inside a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Deleted,
    AlreadyAbsent,
    Failed,
    Skipped,
}

/// Per-recording classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Protected,
    Unprotected,
    Corrupt(Removal),
    /// Cancelled before the metadata arrived
    Unresolved,
}

/// Runs sweeps against a store.
///
/// Holds no state between sweeps; the trigger must not overlap calls.
pub struct Evictor {
    config: Arc<dyn ConfigSource>,
    store: Arc<dyn VideoStore>,
    notifier: Arc<dyn CompletionNotifier>,
}

impl Evictor {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        store: Arc<dyn VideoStore>,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Self {
        Self {
            config,
            store,
            notifier,
        }
    }

    /// Run one sweep to completion
    pub async fn sweep(&self) -> Result<SweepReport, SweepError> {
        self.sweep_with_cancel(&CancellationToken::new()).await
    }

    /// Run one sweep that stops early when `cancel` fires.
    ///
    /// After cancellation no new deletion is started, finished deletions stay
    /// finished, and the notifier still fires with `cancelled` set. Sweeps
    /// that abort on config or listing errors do not notify.
    pub async fn sweep_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SweepReport, SweepError> {
        let quota = self.config.snapshot().await?;

        if quota.is_unlimited() {
            info!("limitless storage, doing nothing");
            let report = SweepReport {
                unlimited: true,
                ..SweepReport::default()
            };
            self.notifier.sweep_completed(&report);
            return Ok(report);
        }

        info!(
            "running, size limit is {} for {:?}",
            format_bytes(quota.max_bytes),
            quota.storage_root
        );

        let videos = self.store.list_videos(&quota.storage_root).await?;
        let mut report = SweepReport {
            listed: videos.len(),
            ..SweepReport::default()
        };

        // join_all yields results in input order, whatever order they finish in
        let verdicts = join_all(videos.iter().map(|video| self.classify(video, cancel))).await;

        let mut unprotected = Vec::new();
        for (video, verdict) in videos.iter().zip(&verdicts) {
            match verdict {
                Verdict::Protected => report.protected += 1,
                Verdict::Unprotected => {
                    report.unprotected += 1;
                    unprotected.push(video);
                }
                Verdict::Corrupt(removal) => {
                    record_removal(&mut report, video, *removal, true);
                }
                Verdict::Unresolved => {}
            }
        }

        if cancel.is_cancelled() {
            warn!("sweep cancelled before quota enforcement");
            report.cancelled = true;
            self.notifier.sweep_completed(&report);
            return Ok(report);
        }

        let selected = select_for_eviction(unprotected, quota.max_bytes);
        info!("deleting {} old video(s)", selected.len());

        let removals = join_all(selected.iter().map(|video| self.remove(video, cancel))).await;
        for (video, removal) in selected.iter().zip(removals) {
            record_removal(&mut report, video, removal, false);
        }

        report.cancelled = cancel.is_cancelled();
        self.notifier.sweep_completed(&report);
        Ok(report)
    }

    async fn classify(&self, video: &VideoFile, cancel: &CancellationToken) -> Verdict {
        let metadata = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Verdict::Unresolved,
            metadata = self.store.metadata(video) => metadata,
        };

        match Class::of(&metadata) {
            Class::Protected => {
                info!("will not delete protected video {}", video.name());
                Verdict::Protected
            }
            Class::Unprotected => Verdict::Unprotected,
            Class::Corrupt => {
                match metadata {
                    Err(e) if e.is_metadata_failure() => {
                        error!("unusable metadata for {}: {}", video.name(), e)
                    }
                    Err(e) => error!("failed to read metadata for {}: {}", video.name(), e),
                    Ok(_) => {}
                }
                Verdict::Corrupt(self.remove(video, cancel).await)
            }
        }
    }

    /// Delete one recording unless the sweep was cancelled first
    async fn remove(&self, video: &VideoFile, cancel: &CancellationToken) -> Removal {
        if cancel.is_cancelled() {
            debug!("skipping delete of {}, sweep cancelled", video.name());
            return Removal::Skipped;
        }

        match self.store.delete(video).await {
            Ok(DeleteOutcome::Deleted) => {
                debug!("deleted {} ({})", video.name(), format_bytes(video.size));
                Removal::Deleted
            }
            Ok(DeleteOutcome::AlreadyAbsent) => {
                warn!("{} was already gone", video.name());
                Removal::AlreadyAbsent
            }
            Err(e) => {
                error!("failed to delete {}: {}", video.name(), e);
                Removal::Failed
            }
        }
    }
}

fn record_removal(report: &mut SweepReport, video: &VideoFile, removal: Removal, corrupt: bool) {
    let name = video.name();
    match removal {
        Removal::Deleted | Removal::AlreadyAbsent => {
            if removal == Removal::Deleted {
                report.bytes_freed += video.size;
            }
            if corrupt {
                report.corrupt_removed.push(name);
            } else {
                report.evicted.push(name);
            }
        }
        Removal::Failed => report.failed.push(name),
        Removal::Skipped => report.skipped += 1,
    }
}
