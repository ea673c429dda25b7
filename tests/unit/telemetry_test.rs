//! Tests for telemetry helpers

use prometheus_admission::util::{init_tracing, init_tracing_with, DEFAULT_FILTER};

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    init_tracing_with("prometheus_admission=debug");
    tracing::info!("tracing initialized repeatedly without panicking");
}

#[test]
fn test_default_filter_parses() {
    assert!(DEFAULT_FILTER.parse::<tracing_subscriber::filter::Directive>().is_ok());
}
