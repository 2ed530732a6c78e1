use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::client;
use crate::metrics::RequestOutcome;

/// One simulated user: issue `requests` requests one after another, collecting the
/// outcome of each.
///
/// Always returns exactly `requests` outcomes; failures are recorded, never retried.
pub(crate) async fn stream_main(
    stream_number: usize,
    requests: usize,
    thread_client: Client,
    url: String,
    pool: Arc<Semaphore>,
) -> Vec<RequestOutcome> {
    info!("launching stream {}...", stream_number);

    let mut outcomes = Vec::new();
    for request_number in 1..=requests {
        let outcome = client::send_request(&thread_client, &url, &pool).await;
        debug!(
            "[stream {}]: request {} finished in {:.2}ms with status {}",
            stream_number, request_number, outcome.latency_ms, outcome.status_code
        );
        if !outcome.success {
            trace!(
                "[stream {}]: request {} failed: {}",
                stream_number,
                request_number,
                outcome.error_message
            );
        }
        outcomes.push(outcome);
    }

    info!("exiting stream {}...", stream_number);
    outcomes
}
