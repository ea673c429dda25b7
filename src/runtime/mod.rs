//! Runtime adapters: task spawning and periodic status reporting.

pub mod reporter;
pub mod spawner;

pub use reporter::{ReporterHandle, StatusObserver, StatusReporter, TracingObserver};
pub use spawner::{Spawn, TokioSpawner};
