//! Configuration models for limits, phases, timeouts, and thresholds.

pub mod scheduler;

pub use scheduler::{PhaseConfig, SchedulerConfig, SizeConfig};
