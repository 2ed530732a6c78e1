//! Functions and structures related to configuring a benchmark run.
//!
//! The command line is parsed into a [`BenchConfiguration`], which is then validated and
//! resolved into an immutable [`RunConfiguration`] with [`BenchConfiguration::configure`].

use gumdrop::Options;
use serde::{Deserialize, Serialize};
use simplelog::*;
use std::path::PathBuf;
use std::time::Duration;

use crate::util;
use crate::BenchError;

/// Base URL of the service when `--url` isn't set.
pub const DEFAULT_URL: &str = "http://localhost:7070";
/// Concurrent streams when `--users` isn't set.
pub const DEFAULT_USERS: usize = 5;
/// Requests per stream when `--requests` isn't set.
pub const DEFAULT_REQUESTS: usize = 10;
/// Per-request timeout in seconds when `--timeout` isn't set.
pub const DEFAULT_TIMEOUT: f64 = 30.0;

/// Path of the health probe, relative to the base URL.
pub const HEALTH_PATH: &str = "/api/health";
/// Path of the load test target, relative to the base URL.
pub const TEST_PATH: &str = "/api/documents/test";

/// Upper bound on the number of requests a single run may issue.
pub const MAX_TOTAL_REQUESTS: usize = 1_000_000;

/// Upper bound on the connect timeout, in seconds.
const MAX_CONNECT_TIMEOUT: f64 = 10.0;
/// Seconds subtracted from the total timeout to derive the read timeout.
const READ_TIMEOUT_MARGIN: f64 = 5.0;

/// Runtime options available when launching a benchmark.
///
/// Help is generated for all of these options by passing `-h`.
#[derive(Options, Debug, Clone, Default, Serialize, Deserialize)]
#[options(
    help = r#"Benchmarks the Stasis PDF generation service through its test endpoint.

The following runtime options are available:"#
)]
pub struct BenchConfiguration {
    /// Displays this help
    #[options(short = "h")]
    pub help: bool,
    /// Prints version information
    #[options(short = "V", help = "Prints version information\n")]
    pub version: bool,

    /// Base URL of the service (default: http://localhost:7070)
    #[options(short = "u", meta = "URL")]
    pub url: Option<String>,
    /// Number of concurrent users (default: 5)
    #[options(short = "U", meta = "USERS")]
    pub users: Option<usize>,
    /// Requests per user (default: 10)
    #[options(short = "r", meta = "REQUESTS")]
    pub requests: Option<usize>,
    /// Request timeout in seconds (default: 30)
    #[options(short = "t", meta = "SECONDS")]
    pub timeout: Option<String>,
    /// Writes results to a JSON file
    #[options(short = "o", meta = "NAME")]
    pub output: Option<String>,
    /// Shows individual request results
    #[options(short = "v", help = "Shows individual request results\n\nLogging:")]
    pub verbose: bool,

    /// Enables log file and sets name
    #[options(short = "G", meta = "NAME")]
    pub log_file: String,
    /// Increases log file level (-g, -gg, etc)
    #[options(short = "g", count)]
    pub log_level: u8,
    /// Decreases console verbosity (-q, -qq, etc)
    #[options(short = "q", count)]
    pub quiet: u8,
}

/// Connect, read and total timeouts applied to every request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestTimeouts {
    pub connect: Duration,
    pub read: Duration,
    pub total: Duration,
}

/// Validated settings for a single benchmark run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunConfiguration {
    /// Base URL of the service, as given.
    pub url: String,
    /// Number of concurrent streams.
    pub users: usize,
    /// Requests issued sequentially by each stream.
    pub requests_per_user: usize,
    /// Per-request timeout, in seconds.
    pub timeout: f64,
    /// Optional path of the JSON results file.
    #[serde(skip)]
    pub output: Option<String>,
    /// Echo individual results before the report.
    #[serde(skip)]
    pub verbose: bool,
}
impl Default for RunConfiguration {
    fn default() -> Self {
        RunConfiguration {
            url: DEFAULT_URL.to_string(),
            users: DEFAULT_USERS,
            requests_per_user: DEFAULT_REQUESTS,
            timeout: DEFAULT_TIMEOUT,
            output: None,
            verbose: false,
        }
    }
}
impl RunConfiguration {
    /// Total number of requests the run will issue.
    pub fn total_requests(&self) -> usize {
        self.users.saturating_mul(self.requests_per_user)
    }

    /// Full URL of the health probe.
    pub fn health_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), HEALTH_PATH)
    }

    /// Full URL of the load test target.
    pub fn test_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), TEST_PATH)
    }

    /// Maximum number of simultaneously open connections.
    pub fn max_connections(&self) -> usize {
        self.users.saturating_mul(2)
    }

    /// Derive the per-request timeouts from the configured total.
    ///
    /// The connect timeout is a third of the total, capped at 10 seconds, and the read
    /// timeout leaves 5 seconds of the total for everything else. Either falls back to
    /// the total when the derived value would be zero or negative.
    pub fn timeouts(&self) -> RequestTimeouts {
        let total = self.timeout;
        let connect = match (total / 3.0).min(MAX_CONNECT_TIMEOUT) {
            c if c > 0.0 => c,
            _ => total,
        };
        let read = match total - READ_TIMEOUT_MARGIN {
            r if r > 0.0 => r,
            _ => total,
        };
        RequestTimeouts {
            connect: Duration::from_secs_f64(connect),
            read: Duration::from_secs_f64(read),
            total: Duration::from_secs_f64(total),
        }
    }
}

impl BenchConfiguration {
    /// Validate the parsed options and resolve defaults into a [`RunConfiguration`].
    pub fn configure(&self) -> Result<RunConfiguration, BenchError> {
        let url = self
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        util::is_valid_host(&url)?;

        let users = self.users.unwrap_or(DEFAULT_USERS);
        if users == 0 {
            return Err(BenchError::InvalidOption {
                option: "`configuration.users`".to_string(),
                value: users.to_string(),
                detail: "`configuration.users` must be set to at least 1.".to_string(),
            });
        }

        let requests_per_user = self.requests.unwrap_or(DEFAULT_REQUESTS);
        if requests_per_user == 0 {
            return Err(BenchError::InvalidOption {
                option: "`configuration.requests`".to_string(),
                value: requests_per_user.to_string(),
                detail: "`configuration.requests` must be set to at least 1.".to_string(),
            });
        }

        match users.checked_mul(requests_per_user) {
            Some(total) if total <= MAX_TOTAL_REQUESTS => (),
            _ => {
                return Err(BenchError::InvalidOption {
                    option: "`configuration.requests`".to_string(),
                    value: format!("{} users x {} requests", users, requests_per_user),
                    detail: format!(
                        "`configuration.users` times `configuration.requests` must not exceed {}.",
                        MAX_TOTAL_REQUESTS
                    ),
                });
            }
        }

        let timeout = match self.timeout.as_ref() {
            Some(value) => match util::get_float_from_string(Some(value.clone())) {
                Some(timeout) if timeout > 0.0 && timeout.is_finite() => timeout,
                _ => {
                    return Err(BenchError::InvalidOption {
                        option: "`configuration.timeout`".to_string(),
                        value: value.to_string(),
                        detail: "`configuration.timeout` must be a number greater than 0."
                            .to_string(),
                    });
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        if let Some(output) = self.output.as_ref() {
            if output.is_empty() {
                return Err(BenchError::InvalidOption {
                    option: "`configuration.output`".to_string(),
                    value: output.to_string(),
                    detail: "`configuration.output` must name a file.".to_string(),
                });
            }
        }

        Ok(RunConfiguration {
            url,
            users,
            requests_per_user,
            timeout,
            output: self.output.clone(),
            verbose: self.verbose,
        })
    }

    /// Initialize the logger which writes to standard out and optionally to a log file.
    pub fn initialize_logger(&self) {
        // Configure console output level.
        let console_level = match self.quiet {
            0 => LevelFilter::Info,
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        };

        // Configure log file level.
        let log_level = match self.log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        let log_file: Option<PathBuf> = if !self.log_file.is_empty() {
            Some(PathBuf::from(&self.log_file))
        } else {
            None
        };

        let mut loggers: Vec<Box<dyn SharedLogger>> =
            vec![SimpleLogger::new(console_level, Config::default())];
        if let Some(log_to_file) = log_file.as_ref() {
            match std::fs::File::create(log_to_file) {
                Ok(file) => loggers.push(WriteLogger::new(log_level, Config::default(), file)),
                Err(e) => eprintln!(
                    "failed to create log file {}: {}",
                    log_to_file.display(),
                    e
                ),
            }
        }

        if let Err(e) = CombinedLogger::init(loggers) {
            eprintln!("failed to initialize CombinedLogger: {}", e);
        }

        if let Some(log_to_file) = log_file {
            info!("Writing to log file: {}", log_to_file.display());
        }
        debug!("Output verbosity level: {}", console_level);
        debug!("Logfile verbosity level: {}", log_level);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> BenchConfiguration {
        BenchConfiguration::parse_args_default(args).unwrap()
    }

    #[test]
    fn defaults() {
        let run = parse(&[]).configure().unwrap();
        assert_eq!(run, RunConfiguration::default());
        assert_eq!(run.url, "http://localhost:7070");
        assert_eq!(run.users, 5);
        assert_eq!(run.requests_per_user, 10);
        assert_eq!(run.timeout, 30.0);
        assert_eq!(run.total_requests(), 50);
        assert_eq!(run.max_connections(), 10);
        assert!(run.output.is_none());
        assert!(!run.verbose);
    }

    #[test]
    fn custom_options() {
        let run = parse(&[
            "--url",
            "http://pdf.example.com:8080/",
            "--users",
            "3",
            "--requests",
            "4",
            "--timeout",
            "12.5",
            "--output",
            "results.json",
            "--verbose",
        ])
        .configure()
        .unwrap();
        // The URL is kept as given, endpoints are joined without a double slash.
        assert_eq!(run.url, "http://pdf.example.com:8080/");
        assert_eq!(run.users, 3);
        assert_eq!(run.requests_per_user, 4);
        assert_eq!(run.timeout, 12.5);
        assert_eq!(run.total_requests(), 12);
        assert_eq!(run.output, Some("results.json".to_string()));
        assert!(run.verbose);
        assert_eq!(run.health_url(), "http://pdf.example.com:8080/api/health");
        assert_eq!(
            run.test_url(),
            "http://pdf.example.com:8080/api/documents/test"
        );
    }

    #[test]
    fn short_options() {
        let configuration = parse(&["-u", "http://127.0.0.1", "-U", "2", "-r", "7", "-v"]);
        assert_eq!(configuration.url, Some("http://127.0.0.1".to_string()));
        assert_eq!(configuration.users, Some(2));
        assert_eq!(configuration.requests, Some(7));
        assert!(configuration.verbose);

        let configuration = parse(&["-qq", "-ggg"]);
        assert_eq!(configuration.quiet, 2);
        assert_eq!(configuration.log_level, 3);
    }

    #[test]
    fn invalid_options() {
        assert!(matches!(
            parse(&["--users", "0"]).configure(),
            Err(BenchError::InvalidOption { .. })
        ));
        assert!(matches!(
            parse(&["--requests", "0"]).configure(),
            Err(BenchError::InvalidOption { .. })
        ));
        assert!(matches!(
            parse(&["--timeout", "0"]).configure(),
            Err(BenchError::InvalidOption { .. })
        ));
        assert!(matches!(
            parse(&["--timeout", "soon"]).configure(),
            Err(BenchError::InvalidOption { .. })
        ));
        assert!(matches!(
            parse(&["--url", "localhost:7070"]).configure(),
            Err(BenchError::InvalidHost { .. })
        ));
    }

    #[test]
    fn run_size_is_bounded() {
        // Would overflow the total request count.
        assert!(matches!(
            parse(&["--users", "4294967296", "--requests", "4294967296"]).configure(),
            Err(BenchError::InvalidOption { .. })
        ));
        // Fits in a usize but is far beyond a sensible run.
        assert!(matches!(
            parse(&["--users", "1", "--requests", "4294967296"]).configure(),
            Err(BenchError::InvalidOption { .. })
        ));
        assert!(matches!(
            parse(&["--users", "1001", "--requests", "1000"]).configure(),
            Err(BenchError::InvalidOption { .. })
        ));

        let run = parse(&["--users", "1000", "--requests", "1000"])
            .configure()
            .unwrap();
        assert_eq!(run.total_requests(), MAX_TOTAL_REQUESTS);

        // Built by hand, bypassing validation: the derived counts saturate.
        let run = RunConfiguration {
            users: usize::MAX,
            requests_per_user: 2,
            ..Default::default()
        };
        assert_eq!(run.total_requests(), usize::MAX);
        assert_eq!(run.max_connections(), usize::MAX);
    }

    #[test]
    fn derived_timeouts() {
        let run = RunConfiguration::default();
        let timeouts = run.timeouts();
        assert_eq!(timeouts.total, Duration::from_secs(30));
        assert_eq!(timeouts.connect, Duration::from_secs(10));
        assert_eq!(timeouts.read, Duration::from_secs(25));

        let run = RunConfiguration {
            timeout: 12.0,
            ..Default::default()
        };
        let timeouts = run.timeouts();
        assert_eq!(timeouts.connect, Duration::from_secs(4));
        assert_eq!(timeouts.read, Duration::from_secs(7));

        // Too short to leave a read margin, fall back to the total.
        let run = RunConfiguration {
            timeout: 3.0,
            ..Default::default()
        };
        let timeouts = run.timeouts();
        assert_eq!(timeouts.connect, Duration::from_secs(1));
        assert_eq!(timeouts.read, Duration::from_secs(3));
    }
}
