//! Per-request bookkeeping.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Sequential request identifier, unique per scheduler instance.
pub type RequestId = u64;

/// Outcome of a scheduled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Not finished yet (waiting or running).
    Pending,
    /// The work item returned `Ok`.
    Succeeded,
    /// The work item returned `Err`, timed out, or was abandoned.
    ///
    /// Abandoned includes submissions dropped while still queued, whose work
    /// item never ran.
    Failed,
}

/// A request tracked by the scheduler from submission until completion.
#[derive(Debug, Clone)]
pub struct ScheduledRequest {
    /// Identifier assigned at submission.
    pub id: RequestId,
    /// Phase label supplied by the driver, if any.
    pub phase: Option<String>,
    /// Document size class (`small`, `large`, ...), if any.
    pub size: Option<String>,
    /// When the request was submitted.
    pub submitted_at: Instant,
    /// When the request was admitted into the active set.
    pub started_at: Option<Instant>,
    /// When the work item finished.
    pub completed_at: Option<Instant>,
    /// Current outcome.
    pub outcome: RequestOutcome,
}

impl ScheduledRequest {
    pub(crate) fn new(
        id: RequestId,
        phase: Option<String>,
        size: Option<String>,
        submitted_at: Instant,
    ) -> Self {
        Self {
            id,
            phase,
            size,
            submitted_at,
            started_at: None,
            completed_at: None,
            outcome: RequestOutcome::Pending,
        }
    }

    pub(crate) fn start(&mut self, at: Instant) {
        self.started_at = Some(at);
    }

    /// Mark the request finished and produce its immutable record.
    pub(crate) fn finish(&mut self, outcome: RequestOutcome, at: Instant) -> RequestRecord {
        self.completed_at = Some(at);
        self.outcome = outcome;
        RequestRecord {
            id: self.id,
            phase: self.phase.clone(),
            size: self.size.clone(),
            wait: self
                .started_at
                .unwrap_or(at)
                .saturating_duration_since(self.submitted_at),
            run: self.started_at.map(|s| at.saturating_duration_since(s)),
            total: at.saturating_duration_since(self.submitted_at),
            outcome,
        }
    }
}

/// Snapshot of a finished request, handed to a [`RecordSink`](crate::core::RecordSink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Request identifier.
    pub id: RequestId,
    /// Phase label, if any.
    pub phase: Option<String>,
    /// Size class, if any.
    #[serde(default)]
    pub size: Option<String>,
    /// Time spent waiting for admission.
    pub wait: Duration,
    /// Time spent executing; `None` if the request never got a slot.
    pub run: Option<Duration>,
    /// Submission to completion.
    pub total: Duration,
    /// Final outcome.
    pub outcome: RequestOutcome,
}

impl RequestRecord {
    /// Whether the request failed.
    pub fn failed(&self) -> bool {
        self.outcome == RequestOutcome::Failed
    }
}
