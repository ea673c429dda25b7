//! Bounded-concurrency request scheduler.
//!
//! Callers hand [`RequestScheduler::submit`] a closure producing the request
//! future. At most `limit` submissions run at once; the rest park in a FIFO
//! queue and are handed a slot, one per release, as running requests finish.
//!
//! All bookkeeping sits behind a single `parking_lot::Mutex` that is never held
//! across an `.await`. Waiting submissions suspend on a `tokio::sync::oneshot`
//! receiver, so a release wakes exactly the waiter it admits.

use std::collections::{BTreeSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use crate::core::{
    RecordSink, RequestId, RequestOutcome, ScheduledRequest, SchedulerError, SchedulerStats,
};

/// Per-submission options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    /// New concurrency limit applied from this submission onwards.
    pub limit_override: Option<usize>,
    /// Upper bound on the work item's execution time (waiting time excluded).
    pub timeout: Option<Duration>,
    /// Phase label carried into the request record.
    pub phase: Option<String>,
    /// Document size class carried into the request record.
    pub size: Option<String>,
}

impl SubmitOptions {
    /// Options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a new concurrency limit with this submission.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit_override = Some(limit);
        self
    }

    /// Bound the work item's execution time.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Label the request with a phase name.
    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Label the request with a document size class.
    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }
}

/// A submission parked until a slot is handed to it.
struct Waiter {
    id: RequestId,
    tx: oneshot::Sender<()>,
}

struct SchedulerState {
    limit: usize,
    active: usize,
    active_set: BTreeSet<RequestId>,
    waiters: VecDeque<Waiter>,
    next_id: RequestId,
    total_submitted: u64,
    total_completed: u64,
    total_failed: u64,
}

impl SchedulerState {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            active: 0,
            active_set: BTreeSet::new(),
            waiters: VecDeque::new(),
            next_id: 0,
            total_submitted: 0,
            total_completed: 0,
            total_failed: 0,
        }
    }

    const fn has_capacity(&self) -> bool {
        self.active < self.limit
    }

    fn occupy(&mut self, id: RequestId) {
        self.active += 1;
        self.active_set.insert(id);
    }

    /// Returns whether `id` was holding a slot.
    fn vacate(&mut self, id: RequestId) -> bool {
        if self.active_set.remove(&id) {
            self.active -= 1;
            true
        } else {
            false
        }
    }

    /// Returns whether `id` was still queued.
    fn withdraw(&mut self, id: RequestId) -> bool {
        match self.waiters.iter().position(|w| w.id == id) {
            Some(pos) => {
                self.waiters.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Hand free slots to the oldest waiters, one slot per waiter.
    fn admit_waiters(&mut self, run_id: Uuid) {
        while self.has_capacity() {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            self.occupy(waiter.id);
            if waiter.tx.send(()).is_err() {
                // Receiver dropped before the hand-off; its guard only counts the completion.
                self.vacate(waiter.id);
                continue;
            }
            tracing::debug!(
                %run_id,
                request_id = waiter.id,
                active = self.active,
                limit = self.limit,
                "woke waiting request"
            );
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn snapshot(&self, elapsed_secs: f64) -> SchedulerStats {
        SchedulerStats::from_counters(
            self.total_submitted,
            self.total_completed,
            self.total_failed,
            self.active as u64,
            elapsed_secs,
            self.limit,
        )
    }
}

/// Admission-controlled executor for outbound request futures.
///
/// Create one per test run and share it behind an `Arc`; independent
/// schedulers never share state.
pub struct RequestScheduler {
    run_id: Uuid,
    start_time: Instant,
    state: Mutex<SchedulerState>,
    sink: Option<Arc<dyn RecordSink>>,
}

impl RequestScheduler {
    /// Create a scheduler admitting at most `limit` concurrent requests.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfiguration`] if `limit` is zero.
    pub fn new(limit: usize) -> Result<Self, SchedulerError> {
        if limit == 0 {
            return Err(SchedulerError::zero_limit("limit"));
        }
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, limit, "request scheduler created");
        Ok(Self {
            run_id,
            start_time: Instant::now(),
            state: Mutex::new(SchedulerState::new(limit)),
            sink: None,
        })
    }

    /// Attach a sink receiving a record for every finished request.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Identifier used to correlate this scheduler's log lines.
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Concurrency limit currently in force.
    pub fn limit(&self) -> usize {
        self.state.lock().limit
    }

    /// Ids of requests currently holding a slot, ascending.
    pub fn active_ids(&self) -> Vec<RequestId> {
        self.state.lock().active_set.iter().copied().collect()
    }

    /// Change the concurrency limit.
    ///
    /// Raising the limit admits queued requests immediately. Lowering it never
    /// interrupts running requests; admission pauses until enough of them finish.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfiguration`] if `limit` is zero.
    pub fn set_limit(&self, limit: usize) -> Result<(), SchedulerError> {
        if limit == 0 {
            return Err(SchedulerError::zero_limit("limit"));
        }
        let mut state = self.state.lock();
        self.apply_limit(&mut state, limit);
        Ok(())
    }

    fn apply_limit(&self, state: &mut SchedulerState, limit: usize) {
        if state.limit != limit {
            tracing::info!(
                run_id = %self.run_id,
                from = state.limit,
                to = limit,
                active = state.active,
                "concurrency limit changed"
            );
            state.limit = limit;
        }
        state.admit_waiters(self.run_id);
    }

    /// Snapshot of the scheduler's counters.
    pub fn status(&self) -> SchedulerStats {
        let state = self.state.lock();
        state.snapshot(self.start_time.elapsed().as_secs_f64())
    }

    /// Run `work` once a slot is free, optionally switching the limit first.
    ///
    /// Returns exactly what the work item returns. The slot is released on every
    /// exit path, including when the returned future is dropped mid-flight.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfiguration`] (converted into `E`) if
    /// `limit_override` is `Some(0)`; otherwise whatever error the work item produced.
    pub async fn submit<F, Fut, T, E>(&self, work: F, limit_override: Option<usize>) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<SchedulerError>,
    {
        let options = SubmitOptions {
            limit_override,
            ..SubmitOptions::default()
        };
        self.submit_with(work, options).await
    }

    /// [`submit`](Self::submit) with an execution timeout and phase label.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfiguration`] for a zero limit override,
    /// [`SchedulerError::Timeout`] if the work item outlives `options.timeout`,
    /// otherwise whatever error the work item produced.
    pub async fn submit_with<F, Fut, T, E>(&self, work: F, options: SubmitOptions) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<SchedulerError>,
    {
        if options.limit_override == Some(0) {
            return Err(SchedulerError::zero_limit("limit_override").into());
        }

        let (mut admission, pending) = self.enqueue(options.limit_override, options.phase, options.size);
        if let Some(rx) = pending {
            rx.await.map_err(|_| {
                SchedulerError::Internal(format!(
                    "admission channel closed for request {}",
                    admission.id()
                ))
            })?;
        }
        admission.start();

        let fut = work();
        let result = match options.timeout {
            Some(limit) => {
                if let Ok(result) = tokio::time::timeout(limit, fut).await {
                    result
                } else {
                    admission.time_out(limit);
                    return Err(SchedulerError::Timeout(limit).into());
                }
            }
            None => fut.await,
        };

        admission.complete(if result.is_ok() {
            RequestOutcome::Succeeded
        } else {
            RequestOutcome::Failed
        });
        drop(admission);
        result
    }

    /// Register a submission and either admit it or queue it behind earlier waiters.
    fn enqueue(
        &self,
        limit_override: Option<usize>,
        phase: Option<String>,
        size: Option<String>,
    ) -> (Admission<'_>, Option<oneshot::Receiver<()>>) {
        let now = Instant::now();
        let mut state = self.state.lock();
        if let Some(limit) = limit_override {
            self.apply_limit(&mut state, limit);
        }

        state.next_id += 1;
        state.total_submitted += 1;
        let id = state.next_id;

        let pending = if state.waiters.is_empty() && state.has_capacity() {
            state.occupy(id);
            tracing::info!(
                run_id = %self.run_id,
                request_id = id,
                active = state.active,
                limit = state.limit,
                "request started immediately"
            );
            None
        } else {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(Waiter { id, tx });
            tracing::debug!(
                run_id = %self.run_id,
                request_id = id,
                active = state.active,
                limit = state.limit,
                queued = state.waiters.len(),
                "request waiting for a slot"
            );
            Some(rx)
        };
        drop(state);

        let admission = Admission {
            scheduler: self,
            request: ScheduledRequest::new(id, phase, size, now),
            outcome: RequestOutcome::Pending,
            timed_out: None,
        };
        (admission, pending)
    }
}

/// Drop guard owning a submission from registration to completion.
///
/// Whatever happens to the submitting future, dropping the guard withdraws the
/// request from the queue or releases its slot, updates the counters, and passes
/// freed capacity on to the next waiter.
///
/// A submission dropped while still queued counts as completed and failed even
/// though its work item never ran, so `SchedulerStats::failed` includes it.
struct Admission<'a> {
    scheduler: &'a RequestScheduler,
    request: ScheduledRequest,
    outcome: RequestOutcome,
    timed_out: Option<Duration>,
}

impl Admission<'_> {
    const fn id(&self) -> RequestId {
        self.request.id
    }

    fn start(&mut self) {
        let now = Instant::now();
        self.request.start(now);
        tracing::debug!(
            run_id = %self.scheduler.run_id,
            request_id = self.id(),
            wait_ms = now.saturating_duration_since(self.request.submitted_at).as_millis(),
            "request admitted"
        );
    }

    fn complete(&mut self, outcome: RequestOutcome) {
        self.outcome = outcome;
    }

    fn time_out(&mut self, limit: Duration) {
        self.timed_out = Some(limit);
        self.outcome = RequestOutcome::Failed;
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        let id = self.id();
        // Pending here means the submitting future was dropped before completion.
        let abandoned = self.outcome == RequestOutcome::Pending;
        let outcome = if abandoned {
            RequestOutcome::Failed
        } else {
            self.outcome
        };
        let record = self.request.finish(outcome, Instant::now());
        let run_id = self.scheduler.run_id;

        let stats = {
            let mut state = self.scheduler.state.lock();
            if !state.withdraw(id) {
                state.vacate(id);
            }
            state.total_completed += 1;
            if outcome == RequestOutcome::Failed {
                state.total_failed += 1;
            }
            state.admit_waiters(run_id);
            state.snapshot(self.scheduler.start_time.elapsed().as_secs_f64())
        };

        let total_ms = record.total.as_millis();
        if let Some(limit) = self.timed_out {
            tracing::warn!(%run_id, request_id = id, ?limit, "request timed out");
        } else if abandoned {
            tracing::warn!(%run_id, request_id = id, "request abandoned before completion");
        } else if outcome == RequestOutcome::Failed {
            tracing::warn!(%run_id, request_id = id, total_ms, "request failed");
        } else {
            tracing::info!(%run_id, request_id = id, total_ms, "request completed");
        }
        if stats.active == 0 || id % 5 == 0 {
            tracing::info!(
                %run_id,
                active = stats.active,
                waiting = stats.waiting,
                completed = stats.completed,
                failed = stats.failed,
                throughput = stats.throughput,
                "queue status"
            );
        }

        if let Some(sink) = self.scheduler.sink.as_ref() {
            sink.record(record);
        }
    }
}
