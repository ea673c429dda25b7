//! # Prometheus Admission
//!
//! Bounded-concurrency admission control for outbound requests issued by the
//! Prometheus AI load-test harness.
//!
//! A load-test driver fires one asynchronous HTTP call per simulated user
//! against the anonymization API. Left unchecked, large documents pile up
//! server-side and every measurement turns into a queueing measurement. The
//! [`RequestScheduler`](core::RequestScheduler) sits in front of those calls:
//!
//! - **Bounded concurrency**: at most `limit` work items run at once
//! - **FIFO backpressure**: excess submissions wait their turn, woken one per
//!   released slot (no polling)
//! - **Per-phase limits**: each submission may switch the limit, e.g. one at a
//!   time for extreme documents, ten under stress
//! - **No slot leaks**: success, error, timeout, panic, or a dropped future all
//!   release the slot
//! - **Live metrics**: active / waiting / completed / failed counts and throughput
//!
//! ## Example
//!
//! ```rust
//! use prometheus_admission::core::RequestScheduler;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let scheduler = RequestScheduler::new(5)?;
//!
//! let body: String = scheduler
//!     .submit(|| async { Ok::<_, anyhow::Error>("anonymized".to_string()) }, None)
//!     .await?;
//! assert_eq!(body, "anonymized");
//!
//! // Extreme documents go one at a time from here on.
//! let _ = scheduler.submit(|| async { Ok::<_, anyhow::Error>(()) }, Some(1)).await;
//! assert_eq!(scheduler.limit(), 1);
//!
//! let stats = scheduler.status();
//! assert_eq!(stats.completed, 2);
//! assert_eq!(stats.active, 0);
//! # Ok(())
//! # }
//! ```
//!
//! Phase limits and timeouts usually come from [`config::SchedulerConfig`],
//! and [`runtime::StatusReporter`] logs progress while a run is in flight.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions, request records, and run summaries.
pub mod core;
/// Configuration models for limits, phases, timeouts, and thresholds.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Runtime adapters: spawning and periodic status reporting.
pub mod runtime;
/// Shared utilities.
pub mod util;
