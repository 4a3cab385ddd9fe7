//! Periodic and on-demand sweep trigger
//!
//! Sweeps run one at a time: a tick or request that arrives mid-sweep waits
//! for it, and on-demand requests made while one is already pending collapse
//! into a single sweep.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::evictor::Evictor;

/// Handle for requesting a sweep outside the regular interval, e.g. right
/// after a recording is finalized
#[derive(Debug, Clone)]
pub struct SweepTrigger {
    tx: mpsc::Sender<()>,
}

impl SweepTrigger {
    /// Ask for a sweep. Returns false once the scheduler is gone.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            // A request is already queued
            Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

/// Drives an [`Evictor`] on an interval
pub struct Scheduler {
    evictor: Arc<Evictor>,
    interval: Duration,
    sweep_timeout: Option<Duration>,
    trigger_tx: mpsc::Sender<()>,
    trigger_rx: mpsc::Receiver<()>,
}

impl Scheduler {
    pub fn new(evictor: Arc<Evictor>, interval: Duration) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        Self {
            evictor,
            interval,
            sweep_timeout: None,
            trigger_tx,
            trigger_rx,
        }
    }

    /// Cancel any sweep that runs longer than `timeout`
    pub fn with_sweep_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.sweep_timeout = timeout;
        self
    }

    pub fn trigger(&self) -> SweepTrigger {
        SweepTrigger {
            tx: self.trigger_tx.clone(),
        }
    }

    /// Sweep immediately, then on every tick or request until `shutdown`.
    /// Cancelling `shutdown` also cancels a sweep that is in progress.
    ///
    /// Returns the number of sweeps started.
    pub async fn run(mut self, shutdown: CancellationToken) -> u64 {
        info!(
            "sweeping every {:?}{}",
            self.interval,
            self.sweep_timeout
                .map(|t| format!(", timeout {:?}", t))
                .unwrap_or_default()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweeps = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => debug!("scheduled sweep"),
                Some(()) = self.trigger_rx.recv() => debug!("on-demand sweep"),
            }

            sweeps += 1;
            self.sweep_once(&shutdown).await;
        }

        info!("scheduler stopped after {} sweep(s)", sweeps);
        sweeps
    }

    async fn sweep_once(&self, shutdown: &CancellationToken) {
        let cancel = shutdown.child_token();

        let watchdog = self.sweep_timeout.map(|limit| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!("sweep exceeded {:?}, cancelling", limit);
                cancel.cancel();
            })
        });

        match self.evictor.sweep_with_cancel(&cancel).await {
            Ok(report) => debug!(
                "sweep finished: {} deleted, {} failed",
                report.deleted_count(),
                report.failed.len()
            ),
            Err(e) => error!("sweep failed: {}", e),
        }

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
    }
}
