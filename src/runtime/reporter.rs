//! Periodic status reporting.
//!
//! A [`StatusReporter`] polls [`RequestScheduler::status`] on a fixed interval
//! and hands each snapshot to a [`StatusObserver`]. The default observer logs
//! the queue status line through `tracing`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::core::{RequestScheduler, SchedulerStats};
use crate::runtime::Spawn;

/// Receives periodic status snapshots.
#[async_trait]
pub trait StatusObserver: Send + Sync + 'static {
    /// Handle one snapshot.
    async fn observe(&self, stats: &SchedulerStats);
}

/// Observer that logs each snapshot at `info` level.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

/// Human-readable status line.
pub fn status_line(stats: &SchedulerStats) -> String {
    format!(
        "{} active, {} waiting, {} completed, {} failed, {:.2} req/s ({:.1}s)",
        stats.active,
        stats.waiting,
        stats.completed,
        stats.failed,
        stats.throughput,
        stats.elapsed_secs
    )
}

#[async_trait]
impl StatusObserver for TracingObserver {
    async fn observe(&self, stats: &SchedulerStats) {
        tracing::info!(limit = stats.limit, "queue status: {}", status_line(stats));
    }
}

/// Handle to a running reporter.
pub struct ReporterHandle {
    stop_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

impl ReporterHandle {
    /// Ask the reporter to emit a final snapshot and exit.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the reporter and wait until its final snapshot has been observed.
    pub async fn shutdown(mut self) {
        self.stop();
        let _ = self.done_rx.wait_for(|done| *done).await;
    }
}

/// Spawns the polling loop.
pub struct StatusReporter;

impl StatusReporter {
    /// Start reporting `scheduler`'s status every `interval` on `spawner`.
    pub fn start<O, S>(
        scheduler: Arc<RequestScheduler>,
        interval: Duration,
        observer: O,
        spawner: &S,
    ) -> ReporterHandle
    where
        O: StatusObserver,
        S: Spawn,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let run_id = scheduler.run_id();

        spawner.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(%run_id, ?interval, "status reporter started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        observer.observe(&scheduler.status()).await;
                    }
                    changed = stop_rx.changed() => {
                        // A dropped handle stops the reporter as well.
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            observer.observe(&scheduler.status()).await;
            tracing::debug!(%run_id, "status reporter stopped");
            let _ = done_tx.send(true);
        });

        ReporterHandle { stop_tx, done_rx }
    }
}
