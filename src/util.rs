//! Utility functions used by stasis-bench, mostly the statistics behind the final report.

use num_format::{Locale, ToFormattedString};
use url::Url;

use crate::BenchError;

/// Truncate a string to at most `max_length` characters.
///
/// Unlike slicing on bytes this never splits a multi-byte character.
///
/// # Example
/// ```rust
/// use stasis_bench::util;
///
/// assert_eq!(util::truncate_string("this is a long string", 7), "this is");
/// assert_eq!(util::truncate_string("shorter string", 15), "shorter string");
/// ```
pub fn truncate_string(str_to_truncate: &str, max_length: usize) -> String {
    match str_to_truncate.char_indices().nth(max_length) {
        None => str_to_truncate.to_string(),
        Some((idx, _)) => str_to_truncate[..idx].to_string(),
    }
}

/// Convert optional string to f64, otherwise return None.
///
/// # Example
/// ```rust
/// use stasis_bench::util;
///
/// assert_eq!(util::get_float_from_string(Some("30".to_string())), Some(30.0));
/// assert_eq!(util::get_float_from_string(Some(".5".to_string())), Some(0.5));
/// assert_eq!(util::get_float_from_string(Some("1.1.1".to_string())), None);
/// assert_eq!(util::get_float_from_string(None), None);
/// ```
pub fn get_float_from_string(string: Option<String>) -> Option<f64> {
    match string {
        Some(s) => match s.parse::<f64>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("failed to convert {} to float: {}", s, e);
                None
            }
        },
        None => None,
    }
}

/// Helper function to determine if a host can be parsed.
///
/// # Example
/// ```rust
/// use stasis_bench::util;
///
/// assert_eq!(util::is_valid_host("http://localhost:7070").is_ok(), true);
///
/// // Protocol is required
/// assert_eq!(util::is_valid_host("localhost:7070/").is_ok(), false);
/// ```
pub fn is_valid_host(host: &str) -> Result<bool, BenchError> {
    let url = Url::parse(host).map_err(|parse_error| BenchError::InvalidHost {
        host: host.to_string(),
        detail: "Invalid host.".to_string(),
        parse_error,
    })?;
    // `localhost:7070` parses with a `localhost` scheme and no host at all.
    if !url.has_host() {
        return Err(BenchError::InvalidHost {
            host: host.to_string(),
            detail: "Host must include a protocol, ie http://".to_string(),
            parse_error: url::ParseError::EmptyHost,
        });
    }
    Ok(true)
}

/// Format large number in locale appropriate style.
pub(crate) fn format_number(number: usize) -> String {
    (number).to_formatted_string(&Locale::en)
}

/// Arithmetic mean of a sample, 0 when the sample is empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Median of a sample, 0 when the sample is empty.
///
/// With an even number of values the median is the mean of the two middle values.
///
/// # Example
/// ```rust
/// use stasis_bench::util;
///
/// assert_eq!(util::median(&[3.0, 1.0, 2.0]), 2.0);
/// assert_eq!(util::median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
/// ```
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sorted = sorted(data);
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

/// Calculate the population standard deviation of a sample.
///
/// Standard deviation is calculated with the following steps:
///  1) determine the mean of the sample
///  2) subtract the mean from each value and square the difference
///  3) average the squared differences (this is the "variance")
///  4) return the square root of the variance
///
/// Fewer than two values have no spread, so 0 is returned.
pub fn standard_deviation(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let mean = mean(data);
    let variance = data
        .iter()
        .map(|value| {
            let difference = value - mean;
            difference * difference
        })
        .sum::<f64>()
        / data.len() as f64;
    variance.sqrt()
}

/// Calculate a percentile, linearly interpolating between the two nearest ranks.
///
/// The fractional rank is `percent / 100 * (len - 1)` into the sorted sample.
///
/// # Example
/// ```rust
/// use stasis_bench::util;
///
/// assert_eq!(util::percentile(&[10.0, 20.0, 30.0, 40.0], 50.0), 25.0);
/// assert_eq!(util::percentile(&[42.0], 99.0), 42.0);
/// assert_eq!(util::percentile(&[], 95.0), 0.0);
/// ```
pub fn percentile(data: &[f64], percent: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sorted = sorted(data);
    let rank = (percent / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let fraction = rank - lower as f64;
    if fraction == 0.0 || lower + 1 >= sorted.len() {
        sorted[lower]
    } else {
        sorted[lower] + (sorted[lower + 1] - sorted[lower]) * fraction
    }
}

fn sorted(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}
