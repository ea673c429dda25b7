//! Build a request scheduler and its record sink from configuration.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{InMemoryRecordSink, RequestScheduler, SchedulerError};

/// A scheduler together with the sink collecting its request records.
pub struct BuiltScheduler {
    /// Shared scheduler handle.
    pub scheduler: Arc<RequestScheduler>,
    /// Record buffer, absent when `max_records` is `0`.
    pub records: Option<Arc<InMemoryRecordSink>>,
}

/// Validate `cfg` and construct a scheduler starting at `default_limit`.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidConfiguration`] if validation fails.
pub fn build_scheduler(cfg: &SchedulerConfig) -> Result<BuiltScheduler, SchedulerError> {
    cfg.validate()
        .map_err(|e| SchedulerError::InvalidConfiguration(format!("config invalid: {e}")))?;

    let mut scheduler = RequestScheduler::new(cfg.default_limit)?;
    let records = (cfg.max_records > 0).then(|| Arc::new(InMemoryRecordSink::new(cfg.max_records)));
    if let Some(sink) = &records {
        scheduler = scheduler.with_sink(sink.clone());
    }

    tracing::info!(
        run_id = %scheduler.run_id(),
        default_limit = cfg.default_limit,
        phases = cfg.phases.len(),
        max_records = cfg.max_records,
        "scheduler built from configuration"
    );
    Ok(BuiltScheduler {
        scheduler: Arc::new(scheduler),
        records,
    })
}
