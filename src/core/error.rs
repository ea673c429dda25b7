//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the scheduler itself.
///
/// Failures of a submitted work item are never wrapped in this type; they are
/// handed back to the submitting caller exactly as the work item produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A concurrency limit or configuration value was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The work item ran longer than its execution timeout.
    #[error("work item timed out after {0:?}")]
    Timeout(Duration),
    /// Internal bookkeeping failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// Build an `InvalidConfiguration` error for a non-positive limit.
    pub fn zero_limit(field: &str) -> Self {
        Self::InvalidConfiguration(format!("{field} must be greater than 0"))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
