//! # stasis-bench
//!
//! Benchmarks the Stasis PDF generation service through its test endpoint, measuring
//! response times, throughput and error rates.
//!
//! A benchmark run has three phases:
//!  1. A health probe, `GET {url}/api/health`. If the service isn't healthy the run stops
//!     here and no load is generated.
//!  2. The load phase: `users` concurrent streams each issue `requests` sequential
//!     `GET {url}/api/documents/test` requests through one shared
//!     [`reqwest`](https://docs.rs/reqwest/) client. Every request is attempted exactly once,
//!     failures are recorded and never retried.
//!  3. Reporting: the collected outcomes are folded into summary statistics which are
//!     printed, and optionally written to a JSON file.
//!
//! ## Running a benchmark
//!
//! ```bash
//! $ stasis-bench --url http://localhost:7070 --users 5 --requests 10 --output results.json
//! ```
//!
//! The same run can be driven as a library:
//!
//! ```rust,no_run
//! use stasis_bench::config::RunConfiguration;
//! use stasis_bench::{Benchmark, BenchError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BenchError> {
//!     let configuration = RunConfiguration {
//!         users: 3,
//!         requests_per_user: 4,
//!         ..Default::default()
//!     };
//!     if let Some(report) = Benchmark::new(configuration)?.execute().await? {
//!         assert_eq!(report.outcomes.len(), 12);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## License
//!
//! Licensed under the Apache License, Version 2.0.

#[macro_use]
extern crate log;

mod client;
pub mod config;
pub mod metrics;
pub mod report;
mod user;
pub mod util;

use reqwest::Client;
use std::sync::Arc;
use std::{fmt, io, time};
use tokio::sync::Semaphore;

use crate::config::RunConfiguration;
use crate::metrics::RequestOutcome;
use crate::report::BenchReport;

/// An enumeration of all errors a [`Benchmark`] can return.
#[derive(Debug)]
pub enum BenchError {
    /// Wraps a [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    Io(io::Error),
    /// Wraps a [`reqwest::Error`](https://docs.rs/reqwest/*/reqwest/struct.Error.html).
    Reqwest(reqwest::Error),
    /// Wraps a [`serde_json::Error`](https://docs.rs/serde_json/*/serde_json/struct.Error.html).
    Json(serde_json::Error),
    /// Wraps a ['tokio::task::JoinError'](https://tokio-rs.github.io/tokio/doc/tokio/task/struct.JoinError.html).
    TokioJoin(tokio::task::JoinError),
    /// Failed to parse a hostname.
    InvalidHost {
        /// The invalid hostname that caused this error.
        host: String,
        /// An optional explanation of the error.
        detail: String,
        /// Wraps a [`url::ParseError`](https://docs.rs/url/*/url/enum.ParseError.html).
        parse_error: url::ParseError,
    },
    /// Invalid option or value specified, may only be invalid in context.
    InvalidOption {
        /// The invalid option that caused this error, may be only invalid in context.
        option: String,
        /// The invalid value that caused this error, may be only invalid in context.
        value: String,
        /// An optional explanation of the error.
        detail: String,
    },
}
/// Implement a helper to provide a text description of all possible types of errors.
impl BenchError {
    fn describe(&self) -> &str {
        match *self {
            BenchError::Io(_) => "io::Error",
            BenchError::Reqwest(_) => "reqwest::Error",
            BenchError::Json(_) => "serde_json::Error",
            BenchError::TokioJoin(_) => "tokio::task::JoinError",
            BenchError::InvalidHost { .. } => "failed to parse hostname",
            BenchError::InvalidOption { .. } => "invalid option or value specified",
        }
    }
}

/// Implement format trait to allow displaying errors.
impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BenchError::Io(ref source) => write!(f, "BenchError: {} ({})", self.describe(), source),
            BenchError::Reqwest(ref source) => {
                write!(f, "BenchError: {} ({})", self.describe(), source)
            }
            BenchError::Json(ref source) => {
                write!(f, "BenchError: {} ({})", self.describe(), source)
            }
            BenchError::TokioJoin(ref source) => {
                write!(f, "BenchError: {} ({})", self.describe(), source)
            }
            BenchError::InvalidHost {
                ref host,
                ref detail,
                ..
            } => write!(f, "BenchError: {} ({}: {})", self.describe(), detail, host),
            BenchError::InvalidOption {
                ref value,
                ref detail,
                ..
            } => write!(f, "BenchError: {} ({} got {})", self.describe(), detail, value),
        }
    }
}

// Define the lower level source of this error, if any.
impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            BenchError::Io(ref source) => Some(source),
            BenchError::Reqwest(ref source) => Some(source),
            BenchError::Json(ref source) => Some(source),
            BenchError::TokioJoin(ref source) => Some(source),
            BenchError::InvalidHost {
                ref parse_error, ..
            } => Some(parse_error),
            _ => None,
        }
    }
}

/// Auto-convert Reqwest errors.
impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> BenchError {
        BenchError::Reqwest(err)
    }
}

/// Auto-convert IO errors.
impl From<io::Error> for BenchError {
    fn from(err: io::Error) -> BenchError {
        BenchError::Io(err)
    }
}

/// Auto-convert serde_json errors.
impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> BenchError {
        BenchError::Json(err)
    }
}

/// Auto-convert TokioJoin errors.
impl From<tokio::task::JoinError> for BenchError {
    fn from(err: tokio::task::JoinError) -> BenchError {
        BenchError::TokioJoin(err)
    }
}

/// A single benchmark run against one service.
#[derive(Clone, Debug)]
pub struct Benchmark {
    configuration: RunConfiguration,
    client: Client,
}
impl Benchmark {
    /// Prepare a benchmark, building the HTTP client shared by all streams.
    pub fn new(configuration: RunConfiguration) -> Result<Benchmark, BenchError> {
        let client = client::build_client(&configuration)?;
        Ok(Benchmark {
            configuration,
            client,
        })
    }

    /// The validated settings this benchmark runs with.
    pub fn configuration(&self) -> &RunConfiguration {
        &self.configuration
    }

    /// Probe the service's health endpoint, returns `true` if it is safe to proceed.
    pub async fn check_health(&self) -> bool {
        client::check_health(&self.client, &self.configuration.health_url()).await
    }

    /// Run the load phase and return every outcome, in stream order.
    ///
    /// All streams are launched together and the function only returns once every
    /// stream has finished all of its requests.
    pub async fn run(&self) -> Result<Vec<RequestOutcome>, BenchError> {
        let configuration = &self.configuration;
        info!(
            "starting benchmark: {} users, {} requests per user, {} total requests, {}s timeout",
            configuration.users,
            configuration.requests_per_user,
            configuration.total_requests(),
            configuration.timeout
        );

        let pool = Arc::new(Semaphore::new(
            configuration.max_connections().min(Semaphore::MAX_PERMITS),
        ));
        let test_url = configuration.test_url();

        let mut streams = Vec::with_capacity(configuration.users);
        for index in 0..configuration.users {
            // Streams are numbered from 1 as they're human-visible (in the logs).
            streams.push(tokio::spawn(user::stream_main(
                index + 1,
                configuration.requests_per_user,
                self.client.clone(),
                test_url.clone(),
                pool.clone(),
            )));
        }

        let mut outcomes = Vec::new();
        for stream in futures::future::join_all(streams).await {
            outcomes.extend(stream?);
        }
        debug!("all streams exited");

        Ok(outcomes)
    }

    /// Execute the complete benchmark: health check, load phase and reporting.
    ///
    /// Returns `Ok(None)` without generating any load if the health check fails.
    /// Otherwise the report is printed, written to the configured output file (if any),
    /// and returned.
    pub async fn execute(self) -> Result<Option<BenchReport>, BenchError> {
        info!("checking service health...");
        if !self.check_health().await {
            error!("service is not available, please start the Stasis service first");
            return Ok(None);
        }
        info!("target URL: {}", self.configuration.url);

        let started = time::Instant::now();
        let outcomes = self.run().await?;
        let duration = started.elapsed().as_secs_f64();

        let report = BenchReport {
            analysis: metrics::analyze_results(&outcomes),
            configuration: self.configuration,
            duration,
            outcomes,
        };

        if report.configuration.verbose {
            print!("{}", report.outcome_listing());
        }
        print!("{}", report);

        if let Some(output) = report.configuration.output.as_ref() {
            report::write_output(output, &report).await?;
        }

        Ok(Some(report))
    }
}
