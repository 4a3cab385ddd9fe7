//! Sweep completion notification

use chrono::{DateTime, Utc};
use reclaim_store::format_bytes;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::evictor::SweepReport;

/// Told once at the end of every sweep that ran, including no-op sweeps
pub trait CompletionNotifier: Send + Sync {
    fn sweep_completed(&self, report: &SweepReport);
}

/// Event published when a sweep finishes
#[derive(Debug, Clone)]
pub struct SweepCompleted {
    pub finished_at: DateTime<Utc>,
    pub report: SweepReport,
}

/// Publishes completions on a broadcast channel so any number of listeners
/// (a file list view, the scheduler's caller) can refresh.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<SweepCompleted>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SweepCompleted> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

impl CompletionNotifier for BroadcastNotifier {
    fn sweep_completed(&self, report: &SweepReport) {
        let event = SweepCompleted {
            finished_at: Utc::now(),
            report: report.clone(),
        };
        if self.tx.send(event).is_err() {
            debug!("no listeners for sweep completion");
        }
    }
}

/// Writes a one-line summary to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl CompletionNotifier for LogNotifier {
    fn sweep_completed(&self, report: &SweepReport) {
        if report.unlimited {
            info!("sweep complete: storage unlimited");
            return;
        }
        info!(
            "sweep complete: {} listed, {} evicted, {} corrupt removed, {} failed, {} freed{}",
            report.listed,
            report.evicted.len(),
            report.corrupt_removed.len(),
            report.failed.len(),
            format_bytes(report.bytes_freed),
            if report.cancelled { " (cancelled)" } else { "" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let notifier = BroadcastNotifier::default();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        let report = SweepReport {
            listed: 3,
            evicted: vec!["a.mp4".to_string()],
            ..SweepReport::default()
        };
        notifier.sweep_completed(&report);

        assert_eq!(first.recv().await.unwrap().report, report);
        assert_eq!(second.recv().await.unwrap().report.listed, 3);
    }

    #[test]
    fn test_broadcast_without_listeners_is_fine() {
        BroadcastNotifier::default().sweep_completed(&SweepReport::default());
    }
}
