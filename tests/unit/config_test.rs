//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use prometheus_admission::config::{PhaseConfig, SchedulerConfig, SizeConfig};
use prometheus_admission::core::{
    RequestOutcome, RequestRecord, SchedulerError, ThresholdBreach, Thresholds,
};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let config = SchedulerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.default_limit, 5);
    assert_eq!(config.limit_for_phase("extreme_test"), 1);
    assert_eq!(config.limit_for_phase("stress_test"), 10);
    assert_eq!(config.limit_for_phase("ramp_up_test"), 5);
}

#[test]
fn test_timeouts_follow_document_size() {
    let config = SchedulerConfig::default();
    assert_eq!(
        config.timeout_for("stress_test", Some("large")),
        Some(Duration::from_secs(600))
    );
    assert_eq!(
        config.timeout_for("extreme_test", Some("extreme")),
        Some(Duration::from_secs(600))
    );
    assert_eq!(
        config.timeout_for("extreme_test", Some("small")),
        Some(Duration::from_secs(300))
    );
    assert_eq!(
        config.timeout_for("constant_load_test", None),
        Some(Duration::from_secs(300))
    );
}

#[test]
fn test_phase_timeout_applies_without_size_timeout() {
    let mut config = SchedulerConfig::default();
    config.phases.insert(
        "soak_test".to_string(),
        PhaseConfig {
            request_timeout_ms: Some(900_000),
            ..PhaseConfig::with_limit(2)
        },
    );
    assert_eq!(
        config.timeout_for_phase("soak_test"),
        Some(Duration::from_secs(900))
    );
    assert_eq!(
        config.timeout_for("soak_test", Some("medium")),
        Some(Duration::from_secs(900))
    );
    assert_eq!(
        config.timeout_for("soak_test", Some("large")),
        Some(Duration::from_secs(600))
    );
}

#[test]
fn test_phase_error_rate_thresholds() {
    let config = SchedulerConfig::default();
    let rate = |phase: &str| config.thresholds_for_phase(phase).max_error_rate;
    assert_eq!(rate("ramp_up_test"), Some(0.05));
    assert_eq!(rate("constant_load_test"), Some(0.1));
    assert_eq!(rate("stress_test"), Some(0.2));
    assert_eq!(rate("extreme_test"), Some(0.3));
    assert_eq!(config.limit_for_phase("ramp_up_test"), 5);
    assert_eq!(config.limit_for_phase("constant_load_test"), 5);
    assert_eq!(config.thresholds_for_phase("warm_up"), &config.thresholds);
}

#[test]
fn test_size_latency_thresholds() {
    let config = SchedulerConfig::default();
    let p95 = |size: &str| config.thresholds_for_size(size).and_then(|t| t.p95_latency_ms);
    assert_eq!(p95("small"), Some(5_000));
    assert_eq!(p95("medium"), Some(15_000));
    assert_eq!(p95("large"), Some(60_000));
    assert_eq!(p95("extreme"), Some(180_000));
    assert_eq!(config.thresholds_for_size("huge"), None);
}

#[test]
fn test_submit_options_for_phase_and_size() {
    let config = SchedulerConfig::default();

    let options = config.submit_options("stress_test", Some("large"));
    assert_eq!(options.limit_override, Some(10));
    assert_eq!(options.timeout, Some(Duration::from_secs(600)));
    assert_eq!(options.phase.as_deref(), Some("stress_test"));
    assert_eq!(options.size.as_deref(), Some("large"));

    let options = config.submit_options("extreme_test", Some("small"));
    assert_eq!(options.limit_override, Some(1));
    assert_eq!(options.timeout, Some(Duration::from_secs(300)));
}

fn records(
    phase: &str,
    size: &str,
    count: u64,
    failures: u64,
    total_ms: u64,
) -> Vec<RequestRecord> {
    (0..count)
        .map(|i| RequestRecord {
            id: i + 1,
            phase: Some(phase.to_string()),
            size: Some(size.to_string()),
            wait: Duration::ZERO,
            run: Some(Duration::from_millis(total_ms)),
            total: Duration::from_millis(total_ms),
            outcome: if i < failures {
                RequestOutcome::Failed
            } else {
                RequestOutcome::Succeeded
            },
        })
        .collect()
}

#[test]
fn test_ramp_up_error_rate_breaches_phase_threshold() {
    let config = SchedulerConfig::default();
    let run = records("ramp_up_test", "medium", 100, 7, 1_000);

    let breaches = config.evaluate(&run, Duration::from_secs(50));
    assert_eq!(breaches.len(), 1);
    let phase = &breaches["phase:ramp_up_test"];
    assert_eq!(phase.len(), 1);
    assert!(matches!(
        phase[0],
        ThresholdBreach::ErrorRate { limit, .. } if (limit - 0.05).abs() < 1e-9
    ));
}

#[test]
fn test_size_breaches_are_reported_per_size() {
    let config = SchedulerConfig::default();
    let mut run = records("constant_load_test", "small", 20, 0, 6_000);
    run.extend(records("constant_load_test", "large", 20, 0, 6_000));

    let breaches = config.evaluate(&run, Duration::from_secs(20));
    assert_eq!(breaches.len(), 1);
    assert!(matches!(
        breaches["size:small"][..],
        [ThresholdBreach::P95Latency { observed_ms: 6_000, limit_ms: 5_000 }]
    ));
    assert!(!breaches.contains_key("size:large"));
}

#[test]
fn test_config_invalid_size() {
    let mut config = SchedulerConfig::default();
    config.sizes.insert(
        "tiny".to_string(),
        SizeConfig {
            request_timeout_ms: Some(0),
            thresholds: None,
        },
    );
    let err = config.validate().unwrap_err();
    assert!(err.contains("size `tiny` invalid"));
}

#[test]
fn test_config_invalid_default_limit() {
    let config = SchedulerConfig {
        default_limit: 0,
        ..SchedulerConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_invalid_phase_limit() {
    let mut config = SchedulerConfig::default();
    config
        .phases
        .insert("broken".to_string(), PhaseConfig::with_limit(0));
    let err = config.validate().unwrap_err();
    assert!(err.contains("phase `broken` invalid"));
}

#[test]
fn test_config_invalid_error_rate() {
    let config = SchedulerConfig {
        thresholds: Thresholds {
            max_error_rate: Some(1.5),
            ..Thresholds::default()
        },
        ..SchedulerConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_invalid_interval() {
    let config = SchedulerConfig {
        status_interval_ms: 0,
        ..SchedulerConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "default_limit": 4,
        "phases": {
            "extreme_test": { "limit": 1 },
            "stress_test": { "limit": 10 }
        },
        "sizes": {
            "large": { "request_timeout_ms": 600000, "thresholds": { "p95_latency_ms": 60000 } }
        },
        "request_timeout_ms": 300000,
        "thresholds": { "p95_latency_ms": 60000, "max_error_rate": 0.1 }
    }"#;

    let config = SchedulerConfig::from_json_str(json).expect("valid config");
    assert_eq!(config.default_limit, 4);
    assert_eq!(config.limit_for_phase("stress_test"), 10);
    assert_eq!(
        config.timeout_for("extreme_test", Some("large")),
        Some(Duration::from_secs(600))
    );
    assert_eq!(config.status_interval_ms, 1_000);
    assert_eq!(config.max_records, 10_000);
    assert_eq!(config.thresholds.min_throughput, None);
}

#[test]
fn test_config_from_json_rejects_zero_limit() {
    let json = r#"{ "default_limit": 0 }"#;
    let err = SchedulerConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("default_limit"));
}

#[test]
fn test_config_from_json_parse_error() {
    let err = SchedulerConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_config_from_lookup_overrides() {
    let config = SchedulerConfig::from_lookup(lookup(&[
        ("ADMISSION_DEFAULT_LIMIT", "8"),
        ("ADMISSION_STATUS_INTERVAL_MS", " 250 "),
        ("ADMISSION_MAX_RECORDS", "0"),
    ]))
    .expect("valid overrides");

    assert_eq!(config.default_limit, 8);
    assert_eq!(config.status_interval(), Duration::from_millis(250));
    assert_eq!(config.max_records, 0);
    assert_eq!(config.request_timeout_ms, Some(300_000));
}

#[test]
fn test_config_from_lookup_rejects_garbage() {
    let err = SchedulerConfig::from_lookup(lookup(&[("ADMISSION_DEFAULT_LIMIT", "many")]))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfiguration(msg) if msg.contains("ADMISSION_DEFAULT_LIMIT")));
}

#[test]
fn test_config_from_lookup_rejects_zero_limit() {
    let err = SchedulerConfig::from_lookup(lookup(&[("ADMISSION_DEFAULT_LIMIT", "0")]))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfiguration(_)));
}
