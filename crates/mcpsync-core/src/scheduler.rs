//! Periodic refresh loop.
//!
//! Runs [`SyncEngine::periodic_refresh`] on tokio's blocking pool at a fixed
//! interval and broadcasts every [`RefreshReport`] to subscribers. The first
//! pass runs immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::settings::{MAX_REFRESH_SECS, MIN_REFRESH_SECS};
use crate::sync::{RefreshReport, SyncEngine};

const REPORT_CHANNEL_CAPACITY: usize = 16;

pub struct RefreshScheduler {
    engine: Arc<SyncEngine>,
    interval: Duration,
    reports: broadcast::Sender<RefreshReport>,
}

impl RefreshScheduler {
    /// `interval` is clamped to the 5–300 second range settings allow.
    pub fn new(engine: Arc<SyncEngine>, interval: Duration) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            engine,
            interval: interval.clamp(
                Duration::from_secs(MIN_REFRESH_SECS),
                Duration::from_secs(MAX_REFRESH_SECS),
            ),
            reports,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshReport> {
        self.reports.subscribe()
    }

    /// Start the loop on the current tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let Self {
            engine,
            interval,
            reports,
        } = self;
        let task_reports = reports.clone();

        tracing::info!(interval_s = interval.as_secs(), "refresh scheduler started");
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let engine = Arc::clone(&engine);
                        match tokio::task::spawn_blocking(move || engine.periodic_refresh()).await {
                            Ok(report) => {
                                if !report.is_quiet() {
                                    tracing::debug!(
                                        synced = report.synced.len(),
                                        skipped = report.skipped.len(),
                                        "periodic refresh"
                                    );
                                }
                                // No subscribers is fine.
                                let _ = task_reports.send(report);
                            }
                            Err(err) => {
                                tracing::error!(error = %err, "periodic refresh task failed");
                            }
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("refresh scheduler stopped");
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            reports,
            task,
        }
    }
}

/// Handle to a running scheduler.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    reports: broadcast::Sender<RefreshReport>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshReport> {
        self.reports.subscribe()
    }

    /// Stop the loop and wait for an in-flight pass to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "refresh scheduler task panicked");
        }
    }
}
