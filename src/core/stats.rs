//! Scheduler statistics snapshots.

use serde::{Deserialize, Serialize};

/// Point-in-time view of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Requests currently holding a slot.
    pub active: u64,
    /// Requests submitted but neither admitted nor finished.
    pub waiting: u64,
    /// Requests finished, successfully or not.
    pub completed: u64,
    /// Requests that finished with a failure, including submissions abandoned
    /// before admission.
    pub failed: u64,
    /// Requests submitted in total.
    pub total: u64,
    /// Completions per second since the scheduler was created.
    pub throughput: f64,
    /// Seconds since the scheduler was created.
    pub elapsed_secs: f64,
    /// Concurrency limit in force at snapshot time.
    pub limit: usize,
}

impl SchedulerStats {
    /// Build a snapshot from raw counters, deriving `waiting` and `throughput`.
    pub fn from_counters(
        total: u64,
        completed: u64,
        failed: u64,
        active: u64,
        elapsed_secs: f64,
        limit: usize,
    ) -> Self {
        Self {
            active,
            waiting: total.saturating_sub(completed).saturating_sub(active),
            completed,
            failed,
            total,
            throughput: throughput(completed, elapsed_secs),
            elapsed_secs,
            limit,
        }
    }

    /// Successful completions.
    pub const fn succeeded(&self) -> u64 {
        self.completed.saturating_sub(self.failed)
    }

    /// Whether nothing is running or queued.
    pub const fn is_idle(&self) -> bool {
        self.active == 0 && self.waiting == 0
    }
}

/// Completions per second, `0.0` when no time has elapsed.
#[allow(clippy::cast_precision_loss)]
pub fn throughput(completed: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        completed as f64 / elapsed_secs
    } else {
        0.0
    }
}
