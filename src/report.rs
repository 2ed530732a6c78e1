//! Renders a finished benchmark as a text report, and optionally as a JSON file.

use chrono::prelude::*;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::RunConfiguration;
use crate::metrics::{BenchAnalysis, RequestOutcome, CONNECTION_ERROR_KEY};
use crate::util::format_number;
use crate::BenchError;

/// Verbose mode only lists this many individual outcomes.
const MAX_LISTED_OUTCOMES: usize = 20;

const RULE: &str =
    " ------------------------------------------------------------------------------";

/// Reliability band, derived from the success rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reliability {
    Excellent,
    Good,
    NeedsImprovement,
}
impl Reliability {
    pub fn from_success_rate(success_rate: f64) -> Self {
        if success_rate >= 99.0 {
            Reliability::Excellent
        } else if success_rate >= 95.0 {
            Reliability::Good
        } else {
            Reliability::NeedsImprovement
        }
    }
}
impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reliability::Excellent => write!(f, "Excellent"),
            Reliability::Good => write!(f, "Good"),
            Reliability::NeedsImprovement => write!(f, "Needs improvement"),
        }
    }
}

/// Response time band, derived from the mean latency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResponseTime {
    Excellent,
    Good,
    Acceptable,
    Slow,
}
impl ResponseTime {
    pub fn from_mean(mean_ms: f64) -> Self {
        if mean_ms < 1_000.0 {
            ResponseTime::Excellent
        } else if mean_ms < 3_000.0 {
            ResponseTime::Good
        } else if mean_ms < 5_000.0 {
            ResponseTime::Acceptable
        } else {
            ResponseTime::Slow
        }
    }
}
impl fmt::Display for ResponseTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResponseTime::Excellent => write!(f, "Excellent (<1s)"),
            ResponseTime::Good => write!(f, "Good (<3s)"),
            ResponseTime::Acceptable => write!(f, "Acceptable (<5s)"),
            ResponseTime::Slow => write!(f, "Slow (>5s)"),
        }
    }
}

/// Tail latency band, derived from the 99th percentile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Latency {
    Excellent,
    Good,
    High,
}
impl Latency {
    pub fn from_p99(p99_ms: f64) -> Self {
        if p99_ms < 2_000.0 {
            Latency::Excellent
        } else if p99_ms < 5_000.0 {
            Latency::Good
        } else {
            Latency::High
        }
    }
}
impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Latency::Excellent => write!(f, "Excellent (<2s)"),
            Latency::Good => write!(f, "Good (<5s)"),
            Latency::High => write!(f, "High (>5s)"),
        }
    }
}

/// Qualitative assessment of a run.
///
/// Latency bands are only meaningful if at least one request succeeded.
#[derive(Clone, Debug, PartialEq)]
pub struct Assessment {
    pub reliability: Reliability,
    pub response_time: Option<ResponseTime>,
    pub latency: Option<Latency>,
}
impl Assessment {
    pub fn new(analysis: &BenchAnalysis) -> Self {
        let succeeded = analysis.successful_requests > 0;
        Assessment {
            reliability: Reliability::from_success_rate(analysis.success_rate),
            response_time: if succeeded {
                Some(ResponseTime::from_mean(analysis.response_times.mean))
            } else {
                None
            },
            latency: if succeeded {
                Some(Latency::from_p99(analysis.response_times.p99))
            } else {
                None
            },
        }
    }
}

/// Everything known about a completed benchmark run.
#[derive(Clone, Debug)]
pub struct BenchReport {
    pub configuration: RunConfiguration,
    /// Wall-clock duration of the load phase, in seconds.
    pub duration: f64,
    pub analysis: BenchAnalysis,
    /// Individual outcomes in stream order.
    pub outcomes: Vec<RequestOutcome>,
}
impl BenchReport {
    /// Successful requests per second over the whole run.
    pub fn throughput(&self) -> f64 {
        if self.duration > 0.0 {
            self.analysis.successful_requests as f64 / self.duration
        } else {
            0.0
        }
    }

    pub fn assessment(&self) -> Assessment {
        Assessment::new(&self.analysis)
    }

    /// Lists the first few individual outcomes, used in verbose mode.
    pub fn outcome_listing(&self) -> OutcomeListing<'_> {
        OutcomeListing(&self.outcomes)
    }

    fn fmt_overview(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "\n === BENCHMARK RESULTS ===\n{}", RULE)?;
        writeln!(fmt, " {:<24} {}", "Target:", self.configuration.url)?;
        writeln!(fmt, " {:<24} {:.2}s", "Total duration:", self.duration)?;
        writeln!(
            fmt,
            " {:<24} {}",
            "Total requests:",
            format_number(self.analysis.total_requests)
        )?;
        writeln!(
            fmt,
            " {:<24} {}",
            "Successful:",
            format_number(self.analysis.successful_requests)
        )?;
        writeln!(
            fmt,
            " {:<24} {}",
            "Failed:",
            format_number(self.analysis.failed_requests)
        )?;
        writeln!(
            fmt,
            " {:<24} {:.1}%",
            "Success rate:", self.analysis.success_rate
        )
    }

    fn fmt_response_times(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.analysis.successful_requests == 0 {
            return Ok(());
        }
        let rt = &self.analysis.response_times;
        writeln!(fmt, "\n === RESPONSE TIMES (ms) ===\n{}", RULE)?;
        writeln!(
            fmt,
            " {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10}",
            "Min", "Max", "Mean", "Median", "Std Dev", "95%", "99%"
        )?;
        writeln!(fmt, "{}", RULE)?;
        writeln!(
            fmt,
            " {:>10.2} | {:>10.2} | {:>10.2} | {:>10.2} | {:>10.2} | {:>10.2} | {:>10.2}",
            rt.min, rt.max, rt.mean, rt.median, rt.std_dev, rt.p95, rt.p99
        )
    }

    fn fmt_throughput(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.analysis.successful_requests == 0 {
            return Ok(());
        }
        let throughput = self.throughput();
        writeln!(fmt, "\n === THROUGHPUT ===\n{}", RULE)?;
        writeln!(fmt, " {:<24} {:.2}", "Requests/second:", throughput)?;
        writeln!(fmt, " {:<24} {:.1}", "PDFs/minute:", throughput * 60.0)
    }

    fn fmt_payload_sizes(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes = &self.analysis.payload_sizes;
        if self.analysis.successful_requests == 0 || sizes.mean <= 0.0 {
            return Ok(());
        }
        writeln!(fmt, "\n === PDF FILE SIZES ===\n{}", RULE)?;
        writeln!(fmt, " {:<24} {} bytes", "Min:", format_number(sizes.min))?;
        writeln!(fmt, " {:<24} {} bytes", "Max:", format_number(sizes.max))?;
        writeln!(
            fmt,
            " {:<24} {} bytes ({:.1} KB)",
            "Average:",
            format_number(sizes.mean.round() as usize),
            sizes.mean / 1024.0
        )
    }

    fn fmt_errors(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.analysis.failed_requests == 0 {
            return Ok(());
        }
        writeln!(fmt, "\n === ERRORS ===\n{}", RULE)?;
        writeln!(fmt, " {:<11} | Error", "Count")?;
        writeln!(fmt, "{}", RULE)?;

        // Display the error occurring the most first.
        for (error_key, occurrences) in self
            .analysis
            .errors
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
        {
            writeln!(fmt, " {:<11} | {}", format_number(*occurrences), error_key)?;
            if let Some(sample) = self.analysis.error_samples.get(error_key) {
                writeln!(fmt, " {:<11} | sample: {}", "", sample)?;
            }
        }

        let connection_errors = self.analysis.connection_errors();
        if connection_errors > 0 {
            writeln!(fmt, "{}", RULE)?;
            writeln!(
                fmt,
                " {} issues: {}/{} failures",
                CONNECTION_ERROR_KEY,
                format_number(connection_errors),
                format_number(self.analysis.failed_requests)
            )?;
        }
        Ok(())
    }

    fn fmt_assessment(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assessment = self.assessment();
        writeln!(fmt, "\n === PERFORMANCE ASSESSMENT ===\n{}", RULE)?;
        writeln!(fmt, " {:<24} {}", "Reliability:", assessment.reliability)?;
        if let Some(response_time) = assessment.response_time {
            writeln!(fmt, " {:<24} {}", "Response Time:", response_time)?;
        }
        if let Some(latency) = assessment.latency {
            writeln!(fmt, " {:<24} {}", "Latency (P99):", latency)?;
        }
        writeln!(fmt, "{}", RULE)
    }
}

/// Implement format trait to allow displaying the report.
impl fmt::Display for BenchReport {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_overview(fmt)?;
        self.fmt_response_times(fmt)?;
        self.fmt_throughput(fmt)?;
        self.fmt_payload_sizes(fmt)?;
        self.fmt_errors(fmt)?;
        self.fmt_assessment(fmt)
    }
}

/// The first outcomes of a run, one per line.
pub struct OutcomeListing<'a>(&'a [RequestOutcome]);
impl fmt::Display for OutcomeListing<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "\n === INDIVIDUAL REQUEST RESULTS ===\n{}", RULE)?;
        for (index, outcome) in self.0.iter().take(MAX_LISTED_OUTCOMES).enumerate() {
            writeln!(
                fmt,
                " {} Request #{}: {:.0}ms, Status: {}",
                if outcome.success { "OK  " } else { "FAIL" },
                index + 1,
                outcome.latency_ms,
                outcome.status_code
            )?;
            if !outcome.success {
                writeln!(fmt, "      Error: {}", outcome.error_message)?;
            }
        }
        if self.0.len() > MAX_LISTED_OUTCOMES {
            writeln!(
                fmt,
                " ... and {} more results",
                format_number(self.0.len() - MAX_LISTED_OUTCOMES)
            )?;
        }
        Ok(())
    }
}

/// Run configuration as written to the JSON results file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputConfiguration {
    pub url: String,
    pub concurrent_users: usize,
    pub requests_per_user: usize,
    pub total_requests: usize,
}

/// Document written to the JSON results file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    /// ISO-8601 local time the document was written.
    pub timestamp: String,
    pub configuration: OutputConfiguration,
    /// Seconds.
    pub duration: f64,
    pub analysis: BenchAnalysis,
}
impl OutputDocument {
    pub fn new(report: &BenchReport) -> Self {
        OutputDocument {
            timestamp: Local::now().to_rfc3339(),
            configuration: OutputConfiguration {
                url: report.configuration.url.clone(),
                concurrent_users: report.configuration.users,
                requests_per_user: report.configuration.requests_per_user,
                total_requests: report.configuration.total_requests(),
            },
            duration: report.duration,
            analysis: report.analysis.clone(),
        }
    }
}

/// Write the report as pretty-printed JSON to `path`.
pub async fn write_output(path: &str, report: &BenchReport) -> Result<(), BenchError> {
    let document = OutputDocument::new(report);
    let json = serde_json::to_string_pretty(&document)?;
    let mut file = File::create(path).await?;
    file.write_all(json.as_bytes()).await?;
    file.flush().await?;
    info!("results saved to: {}", path);
    Ok(())
}
