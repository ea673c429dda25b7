//! Unit tests for individual components

mod config_test;
mod runtime_test;
mod telemetry_test;
