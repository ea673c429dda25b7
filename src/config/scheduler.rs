//! Scheduler and phase configuration structures.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{
    RequestRecord, RunSummary, SchedulerError, SubmitOptions, ThresholdBreach, Thresholds,
};

const ENV_DEFAULT_LIMIT: &str = "ADMISSION_DEFAULT_LIMIT";
const ENV_REQUEST_TIMEOUT_MS: &str = "ADMISSION_REQUEST_TIMEOUT_MS";
const ENV_STATUS_INTERVAL_MS: &str = "ADMISSION_STATUS_INTERVAL_MS";
const ENV_MAX_RECORDS: &str = "ADMISSION_MAX_RECORDS";

/// Per-phase overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Concurrency limit while this phase runs.
    pub limit: usize,
    /// Execution timeout for requests in this phase, in milliseconds.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Thresholds checked against this phase's requests.
    #[serde(default)]
    pub thresholds: Option<Thresholds>,
}

impl PhaseConfig {
    /// Phase with only a limit.
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            request_timeout_ms: None,
            thresholds: None,
        }
    }
}

/// Per-size-class overrides, keyed by the document size label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeConfig {
    /// Execution timeout for requests of this size, in milliseconds.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Thresholds checked against requests of this size.
    #[serde(default)]
    pub thresholds: Option<Thresholds>,
}

impl SizeConfig {
    /// Size class with only a p95 latency limit.
    pub const fn with_p95(p95_latency_ms: u64) -> Self {
        Self {
            request_timeout_ms: None,
            thresholds: Some(Thresholds {
                p95_latency_ms: Some(p95_latency_ms),
                max_error_rate: None,
                min_throughput: None,
            }),
        }
    }

    /// Validate size values.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == Some(0) {
            return Err("request_timeout_ms must be greater than 0".into());
        }
        if let Some(thresholds) = &self.thresholds {
            validate_thresholds("thresholds", thresholds)?;
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Limit used when no phase override applies.
    pub default_limit: usize,
    /// Map of phase name to overrides.
    #[serde(default)]
    pub phases: HashMap<String, PhaseConfig>,
    /// Map of document size class to overrides.
    #[serde(default)]
    pub sizes: HashMap<String, SizeConfig>,
    /// Default execution timeout in milliseconds.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Interval between status reports in milliseconds.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
    /// Capacity of the in-memory record buffer; `0` disables recording.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Run-wide thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,
}

const fn default_status_interval_ms() -> u64 {
    1_000
}

const fn default_max_records() -> usize {
    10_000
}

impl Default for SchedulerConfig {
    /// Load-test defaults: 5 concurrent requests, one at a time for extreme
    /// documents, 10 under stress. Error-rate limits are per phase, latency
    /// limits per document size, and large or extreme documents get a 600 s
    /// timeout instead of 300 s.
    fn default() -> Self {
        let phase = |limit: usize, max_error_rate: f64| PhaseConfig {
            limit,
            request_timeout_ms: None,
            thresholds: Some(Thresholds {
                p95_latency_ms: None,
                max_error_rate: Some(max_error_rate),
                min_throughput: None,
            }),
        };
        let phases = HashMap::from([
            ("ramp_up_test".to_string(), phase(5, 0.05)),
            ("constant_load_test".to_string(), phase(5, 0.1)),
            ("stress_test".to_string(), phase(10, 0.2)),
            ("extreme_test".to_string(), phase(1, 0.3)),
        ]);

        let long = |p95_latency_ms: u64| SizeConfig {
            request_timeout_ms: Some(600_000),
            ..SizeConfig::with_p95(p95_latency_ms)
        };
        let sizes = HashMap::from([
            ("small".to_string(), SizeConfig::with_p95(5_000)),
            ("medium".to_string(), SizeConfig::with_p95(15_000)),
            ("large".to_string(), long(60_000)),
            ("extreme".to_string(), long(180_000)),
        ]);

        Self {
            default_limit: 5,
            phases,
            sizes,
            request_timeout_ms: Some(300_000),
            status_interval_ms: default_status_interval_ms(),
            max_records: default_max_records(),
            thresholds: Thresholds {
                p95_latency_ms: Some(60_000),
                max_error_rate: Some(0.1),
                min_throughput: Some(1.0),
            },
        }
    }
}

fn validate_thresholds(scope: &str, thresholds: &Thresholds) -> Result<(), String> {
    if let Some(rate) = thresholds.max_error_rate {
        if !(0.0..=1.0).contains(&rate) {
            return Err(format!("{scope}: max_error_rate must be within [0, 1]"));
        }
    }
    if thresholds.p95_latency_ms == Some(0) {
        return Err(format!("{scope}: p95_latency_ms must be greater than 0"));
    }
    if let Some(rps) = thresholds.min_throughput {
        if rps < 0.0 {
            return Err(format!("{scope}: min_throughput must not be negative"));
        }
    }
    Ok(())
}

impl PhaseConfig {
    /// Validate phase values.
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("limit must be greater than 0".into());
        }
        if self.request_timeout_ms == Some(0) {
            return Err("request_timeout_ms must be greater than 0".into());
        }
        if let Some(thresholds) = &self.thresholds {
            validate_thresholds("thresholds", thresholds)?;
        }
        Ok(())
    }
}

impl SchedulerConfig {
    /// Validate the root values and every phase.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_limit == 0 {
            return Err("default_limit must be greater than 0".into());
        }
        if self.request_timeout_ms == Some(0) {
            return Err("request_timeout_ms must be greater than 0".into());
        }
        if self.status_interval_ms == 0 {
            return Err("status_interval_ms must be greater than 0".into());
        }
        validate_thresholds("thresholds", &self.thresholds)?;
        for (name, phase) in &self.phases {
            phase
                .validate()
                .map_err(|e| format!("phase `{name}` invalid: {e}"))?;
        }
        for (name, size) in &self.sizes {
            size.validate().map_err(|e| format!("size `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overlaid with `ADMISSION_*` environment
    /// variables, loading a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfiguration`] for unparsable values or
    /// a configuration that fails validation.
    pub fn from_env() -> Result<Self, SchedulerError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfiguration`] for unparsable values or
    /// a configuration that fails validation.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, SchedulerError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(limit) = parse_var(&lookup, ENV_DEFAULT_LIMIT)? {
            cfg.default_limit = limit;
        }
        if let Some(timeout) = parse_var(&lookup, ENV_REQUEST_TIMEOUT_MS)? {
            cfg.request_timeout_ms = Some(timeout);
        }
        if let Some(interval) = parse_var(&lookup, ENV_STATUS_INTERVAL_MS)? {
            cfg.status_interval_ms = interval;
        }
        if let Some(max_records) = parse_var(&lookup, ENV_MAX_RECORDS)? {
            cfg.max_records = max_records;
        }
        cfg.validate().map_err(SchedulerError::InvalidConfiguration)?;
        Ok(cfg)
    }

    /// Concurrency limit for `phase`, falling back to `default_limit`.
    pub fn limit_for_phase(&self, phase: &str) -> usize {
        self.phases
            .get(phase)
            .map_or(self.default_limit, |p| p.limit)
    }

    /// Execution timeout for `phase`, falling back to the run-wide timeout.
    pub fn timeout_for_phase(&self, phase: &str) -> Option<Duration> {
        self.phases
            .get(phase)
            .and_then(|p| p.request_timeout_ms)
            .or(self.request_timeout_ms)
            .map(Duration::from_millis)
    }

    /// Execution timeout for a request of `size` in `phase`.
    ///
    /// A size-class timeout wins over the phase timeout, which wins over the
    /// run-wide one.
    pub fn timeout_for(&self, phase: &str, size: Option<&str>) -> Option<Duration> {
        size.and_then(|s| self.sizes.get(s))
            .and_then(|s| s.request_timeout_ms)
            .map(Duration::from_millis)
            .or_else(|| self.timeout_for_phase(phase))
    }

    /// Thresholds for `phase`, falling back to the run-wide thresholds.
    pub fn thresholds_for_phase(&self, phase: &str) -> &Thresholds {
        self.phases
            .get(phase)
            .and_then(|p| p.thresholds.as_ref())
            .unwrap_or(&self.thresholds)
    }

    /// Thresholds for a size class; `None` when the class has none of its own.
    pub fn thresholds_for_size(&self, size: &str) -> Option<&Thresholds> {
        self.sizes.get(size).and_then(|s| s.thresholds.as_ref())
    }

    /// Submission options carrying `phase`'s limit and label, plus the timeout
    /// chosen by document `size`.
    pub fn submit_options(&self, phase: &str, size: Option<&str>) -> SubmitOptions {
        SubmitOptions {
            limit_override: Some(self.limit_for_phase(phase)),
            timeout: self.timeout_for(phase, size),
            phase: Some(phase.to_string()),
            size: size.map(str::to_string),
        }
    }

    /// Check `records` against the run-wide, per-phase, and per-size thresholds.
    ///
    /// Keys are `"run"`, `"phase:<name>"`, and `"size:<name>"`; only scopes with
    /// at least one breach are present.
    pub fn evaluate(
        &self,
        records: &[RequestRecord],
        elapsed: Duration,
    ) -> BTreeMap<String, Vec<ThresholdBreach>> {
        let mut breaches = BTreeMap::new();
        let mut check = |scope: String, thresholds: &Thresholds, summary: &RunSummary| {
            let found = thresholds.evaluate(summary);
            if !found.is_empty() {
                breaches.insert(scope, found);
            }
        };

        check(
            "run".to_string(),
            &self.thresholds,
            &RunSummary::from_records(records, elapsed),
        );
        for (phase, summary) in RunSummary::by_phase(records, elapsed) {
            let thresholds = self.phases.get(&phase).and_then(|p| p.thresholds.as_ref());
            if let Some(thresholds) = thresholds {
                check(format!("phase:{phase}"), thresholds, &summary);
            }
        }
        for (size, summary) in RunSummary::by_size(records, elapsed) {
            if let Some(thresholds) = self.thresholds_for_size(&size) {
                check(format!("size:{size}"), thresholds, &summary);
            }
        }
        breaches
    }

    /// Status report interval.
    pub const fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

fn parse_var<L, T>(lookup: &L, key: &str) -> Result<Option<T>, SchedulerError>
where
    L: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                SchedulerError::InvalidConfiguration(format!("{key}={raw:?}: {e}"))
            })
        })
        .transpose()
}
