//! Core scheduling abstractions and completion accounting.

pub mod error;
pub mod request;
pub mod scheduler;
pub mod sink;
pub mod stats;
pub mod summary;

pub use error::{AppResult, SchedulerError};
pub use request::{RequestId, RequestOutcome, RequestRecord, ScheduledRequest};
pub use scheduler::{RequestScheduler, SubmitOptions};
pub use sink::{InMemoryRecordSink, RecordSink};
pub use stats::SchedulerStats;
pub use summary::{RunSummary, ThresholdBreach, Thresholds};
