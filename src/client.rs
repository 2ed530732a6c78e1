//! HTTP plumbing: building the shared client, probing service health and issuing the
//! individual benchmark requests.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::config::RunConfiguration;
use crate::metrics::RequestOutcome;
use crate::util;
use crate::BenchError;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Error messages recorded in an outcome are truncated to this many characters.
const ERROR_MESSAGE_LENGTH: usize = 200;

/// Build the client shared by every stream.
///
/// The same connect, read and total timeouts apply to every request made with it.
pub(crate) fn build_client(configuration: &RunConfiguration) -> Result<Client, BenchError> {
    let timeouts = configuration.timeouts();
    trace!("building client with timeouts {:?}", timeouts);
    let client = Client::builder()
        .user_agent(APP_USER_AGENT)
        .connect_timeout(timeouts.connect)
        .read_timeout(timeouts.read)
        .timeout(timeouts.total)
        .pool_max_idle_per_host(configuration.max_connections())
        .build()?;
    Ok(client)
}

/// Confirm the service is up before generating any load.
///
/// Healthy means an HTTP 200 carrying a JSON body. Any other status, an unparseable
/// body, or a transport error counts as unhealthy.
pub(crate) async fn check_health(client: &Client, url: &str) -> bool {
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            error!("health check failed: {}", e);
            return false;
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        error!("health check failed with status: {}", status.as_u16());
        return false;
    }

    match response.json::<Value>().await {
        Ok(body) => {
            let service = body
                .get("service")
                .and_then(Value::as_str)
                .unwrap_or("Unknown");
            info!("service is healthy: {}", service);
            true
        }
        Err(e) => {
            error!("health check failed: {}", e);
            false
        }
    }
}

/// Issue a single request against the test endpoint and classify the result.
///
/// Never fails: every way a request can go wrong is captured in the returned outcome.
/// The request waits for one of the `pool` permits before it is sent.
pub(crate) async fn send_request(client: &Client, url: &str, pool: &Semaphore) -> RequestOutcome {
    let _permit = match pool.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            return RequestOutcome::failure(0.0, 0, client_error(&e.to_string()));
        }
    };

    let started = Instant::now();
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => return transport_failure(elapsed_ms(started), &e),
    };
    let latency_ms = elapsed_ms(started);

    let status = response.status();
    if status == StatusCode::OK {
        match response.bytes().await {
            Ok(body) => RequestOutcome::success(latency_ms, status.as_u16(), body.len()),
            Err(e) => transport_failure(elapsed_ms(started), &e),
        }
    } else {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return transport_failure(elapsed_ms(started), &e),
        };
        RequestOutcome::failure(
            latency_ms,
            status.as_u16(),
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                util::truncate_string(&body, ERROR_MESSAGE_LENGTH)
            ),
        )
    }
}

/// Classify a request that never produced a usable response.
fn transport_failure(latency_ms: f64, error: &reqwest::Error) -> RequestOutcome {
    let error_message = if error.is_timeout() {
        format!("Timeout after {:.0}ms", latency_ms)
    } else {
        client_error(&error.to_string())
    };
    RequestOutcome::failure(latency_ms, 0, error_message)
}

fn client_error(detail: &str) -> String {
    format!(
        "Client error: {}",
        util::truncate_string(detail, ERROR_MESSAGE_LENGTH)
    )
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
