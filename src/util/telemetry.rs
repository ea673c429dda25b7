//! Tracing subscriber setup for load-test drivers.
//!
//! Scheduler events carry `run_id` and `request_id` fields; the fmt layer
//! prints them inline, so targets are omitted to keep status lines short.

use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "prometheus_admission=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, or [`DEFAULT_FILTER`].
///
/// Does nothing when a global subscriber is already set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// Install a fmt subscriber with explicit filter directives, ignoring `RUST_LOG`.
///
/// Does nothing when a global subscriber is already set.
pub fn init_tracing_with(directives: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    install(EnvFilter::new(directives));
}

fn install(filter: EnvFilter) {
    // Losing a race with another initializer is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
