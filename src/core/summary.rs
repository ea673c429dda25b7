//! Latency and error-rate summaries over finished requests, checked against thresholds.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::stats::throughput;
use crate::core::RequestRecord;

/// Aggregate view of a set of finished requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of requests summarized.
    pub count: u64,
    /// Number of failed requests.
    pub failed: u64,
    /// `failed / count`, `0.0` for an empty set.
    pub error_rate: f64,
    /// Requests per second over `elapsed`.
    pub throughput: f64,
    /// Median submission-to-completion latency.
    pub p50: Duration,
    /// 95th percentile latency.
    pub p95: Duration,
    /// 99th percentile latency.
    pub p99: Duration,
    /// Slowest request.
    pub max: Duration,
}

impl RunSummary {
    /// Summarize `records` observed over `elapsed` wall time.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_records(records: &[RequestRecord], elapsed: Duration) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let mut latencies: Vec<Duration> = records.iter().map(|r| r.total).collect();
        latencies.sort_unstable();

        let count = records.len() as u64;
        let failed = records.iter().filter(|r| r.failed()).count() as u64;
        Self {
            count,
            failed,
            error_rate: failed as f64 / count as f64,
            throughput: throughput(count, elapsed.as_secs_f64()),
            p50: percentile(&latencies, 50.0),
            p95: percentile(&latencies, 95.0),
            p99: percentile(&latencies, 99.0),
            max: latencies.last().copied().unwrap_or_default(),
        }
    }

    /// One summary per phase label; unlabelled requests go under `"default"`.
    pub fn by_phase(records: &[RequestRecord], elapsed: Duration) -> BTreeMap<String, Self> {
        Self::grouped(records, elapsed, |r| r.phase.as_deref())
    }

    /// One summary per size class; unlabelled requests go under `"default"`.
    pub fn by_size(records: &[RequestRecord], elapsed: Duration) -> BTreeMap<String, Self> {
        Self::grouped(records, elapsed, |r| r.size.as_deref())
    }

    fn grouped<K>(records: &[RequestRecord], elapsed: Duration, key: K) -> BTreeMap<String, Self>
    where
        K: Fn(&RequestRecord) -> Option<&str>,
    {
        let mut grouped: BTreeMap<String, Vec<RequestRecord>> = BTreeMap::new();
        for record in records {
            let label = key(record).unwrap_or("default").to_string();
            grouped.entry(label).or_default().push(record.clone());
        }
        grouped
            .into_iter()
            .map(|(label, group)| (label, Self::from_records(&group, elapsed)))
            .collect()
    }
}

/// Nearest-rank percentile over sorted samples.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn percentile(sorted: &[Duration], pct: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Pass/fail limits for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// 95th percentile latency must stay below this many milliseconds.
    #[serde(default)]
    pub p95_latency_ms: Option<u64>,
    /// Error rate must stay below this fraction.
    #[serde(default)]
    pub max_error_rate: Option<f64>,
    /// Throughput must stay above this many requests per second.
    #[serde(default)]
    pub min_throughput: Option<f64>,
}

/// A threshold that a run did not meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdBreach {
    /// p95 latency was at or above the limit.
    P95Latency {
        /// Observed p95 in milliseconds.
        observed_ms: u64,
        /// Configured limit in milliseconds.
        limit_ms: u64,
    },
    /// Error rate was at or above the limit.
    ErrorRate {
        /// Observed error rate.
        observed: f64,
        /// Configured limit.
        limit: f64,
    },
    /// Throughput was at or below the floor.
    Throughput {
        /// Observed requests per second.
        observed: f64,
        /// Configured floor.
        limit: f64,
    },
}

impl fmt::Display for ThresholdBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P95Latency { observed_ms, limit_ms } => {
                write!(f, "p95 latency {observed_ms}ms >= {limit_ms}ms")
            }
            Self::ErrorRate { observed, limit } => {
                write!(f, "error rate {observed:.3} >= {limit:.3}")
            }
            Self::Throughput { observed, limit } => {
                write!(f, "throughput {observed:.2} req/s <= {limit:.2} req/s")
            }
        }
    }
}

impl Thresholds {
    /// Check a summary; an empty result means every threshold passed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn evaluate(&self, summary: &RunSummary) -> Vec<ThresholdBreach> {
        let mut breaches = Vec::new();
        if let Some(limit_ms) = self.p95_latency_ms {
            let observed_ms = summary.p95.as_millis() as u64;
            if observed_ms >= limit_ms {
                breaches.push(ThresholdBreach::P95Latency { observed_ms, limit_ms });
            }
        }
        if let Some(limit) = self.max_error_rate {
            if summary.error_rate >= limit {
                breaches.push(ThresholdBreach::ErrorRate {
                    observed: summary.error_rate,
                    limit,
                });
            }
        }
        if let Some(limit) = self.min_throughput {
            if summary.throughput <= limit {
                breaches.push(ThresholdBreach::Throughput {
                    observed: summary.throughput,
                    limit,
                });
            }
        }
        breaches
    }
}
