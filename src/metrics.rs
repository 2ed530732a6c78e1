//! Per-request outcomes and the statistics derived from them.
//!
//! Every request issued during a benchmark produces exactly one [`RequestOutcome`],
//! whether it succeeded, was rejected by the server, or never got a response at all.
//! Once all streams have exited the outcomes are folded into a [`BenchAnalysis`] by
//! [`analyze_results`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::util;

/// Histogram key for failures that never received an HTTP status.
pub const CONNECTION_ERROR_KEY: &str = "Connection/Timeout";

/// Sample error messages are truncated to this many characters.
const ERROR_SAMPLE_LENGTH: usize = 100;

/// The recorded result of one request attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    /// How long the request took, in milliseconds.
    pub latency_ms: f64,
    /// HTTP status code, or 0 if the request failed before a response arrived.
    pub status_code: u16,
    /// Only an HTTP 200 is a success.
    pub success: bool,
    /// Size of the response body in bytes, only recorded on success.
    pub payload_size: usize,
    /// Truncated description of the failure, empty on success.
    pub error_message: String,
}
impl RequestOutcome {
    /// A successful request that returned `payload_size` bytes.
    pub fn success(latency_ms: f64, status_code: u16, payload_size: usize) -> Self {
        RequestOutcome {
            latency_ms,
            status_code,
            success: true,
            payload_size,
            error_message: String::new(),
        }
    }

    /// A failed request, `status_code` is 0 for transport level failures.
    pub fn failure(latency_ms: f64, status_code: u16, error_message: String) -> Self {
        RequestOutcome {
            latency_ms,
            status_code,
            success: false,
            payload_size: 0,
            error_message,
        }
    }

    /// Key under which this outcome is counted in the error histogram.
    pub fn error_key(&self) -> String {
        if self.status_code > 0 {
            format!("HTTP_{}", self.status_code)
        } else {
            CONNECTION_ERROR_KEY.to_string()
        }
    }
}

/// Latency distribution of successful requests, in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseTimeMetrics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub p95: f64,
    pub p99: f64,
}
impl ResponseTimeMetrics {
    fn from_latencies(latencies: &[f64]) -> Self {
        if latencies.is_empty() {
            return ResponseTimeMetrics::default();
        }
        ResponseTimeMetrics {
            min: latencies.iter().cloned().fold(f64::INFINITY, f64::min),
            max: latencies.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            mean: util::mean(latencies),
            median: util::median(latencies),
            std_dev: util::standard_deviation(latencies),
            p95: util::percentile(latencies, 95.0),
            p99: util::percentile(latencies, 99.0),
        }
    }
}

/// Size distribution of successful response bodies, in bytes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadSizeMetrics {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}
impl PayloadSizeMetrics {
    fn from_sizes(sizes: &[usize]) -> Self {
        if sizes.is_empty() {
            return PayloadSizeMetrics::default();
        }
        PayloadSizeMetrics {
            min: sizes.iter().copied().min().unwrap_or(0),
            max: sizes.iter().copied().max().unwrap_or(0),
            mean: sizes.iter().sum::<usize>() as f64 / sizes.len() as f64,
        }
    }
}

/// Aggregate statistics for a complete benchmark run.
///
/// Field names match the keys of the `analysis` object in the JSON results file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchAnalysis {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    /// Percentage of requests that succeeded, 0 - 100.
    pub success_rate: f64,
    pub response_times: ResponseTimeMetrics,
    #[serde(rename = "file_sizes")]
    pub payload_sizes: PayloadSizeMetrics,
    /// Number of failures per error key.
    pub errors: BTreeMap<String, usize>,
    /// First message seen for each error key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub error_samples: BTreeMap<String, String>,
}
impl BenchAnalysis {
    /// Total failures that never received an HTTP response.
    pub fn connection_errors(&self) -> usize {
        self.errors.get(CONNECTION_ERROR_KEY).copied().unwrap_or(0)
    }
}

/// Fold a collection of outcomes into summary statistics.
///
/// An empty collection produces an all-zero analysis.
pub fn analyze_results(outcomes: &[RequestOutcome]) -> BenchAnalysis {
    let (successful, failed): (Vec<&RequestOutcome>, Vec<&RequestOutcome>) =
        outcomes.iter().partition(|outcome| outcome.success);

    let success_rate = if outcomes.is_empty() {
        0.0
    } else {
        successful.len() as f64 / outcomes.len() as f64 * 100.0
    };

    let latencies: Vec<f64> = successful.iter().map(|o| o.latency_ms).collect();
    let sizes: Vec<usize> = successful
        .iter()
        .map(|o| o.payload_size)
        .filter(|size| *size > 0)
        .collect();

    let mut errors: BTreeMap<String, usize> = BTreeMap::new();
    let mut error_samples: BTreeMap<String, String> = BTreeMap::new();
    for outcome in &failed {
        let key = outcome.error_key();
        error_samples.entry(key.clone()).or_insert_with(|| {
            util::truncate_string(&outcome.error_message, ERROR_SAMPLE_LENGTH)
        });
        *errors.entry(key).or_insert(0) += 1;
    }

    BenchAnalysis {
        total_requests: outcomes.len(),
        successful_requests: successful.len(),
        failed_requests: failed.len(),
        success_rate,
        response_times: ResponseTimeMetrics::from_latencies(&latencies),
        payload_sizes: PayloadSizeMetrics::from_sizes(&sizes),
        errors,
        error_samples,
    }
}
