//! Retry logic with exponential backoff.

use reqwest::{Method, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Upper bound on attempts for any single call, including the first.
pub const MAX_ATTEMPTS: u32 = 5;

/// Parameters for exponential backoff.
#[derive(Debug, Clone)]
pub struct BackoffParams {
    /// Initial delay in milliseconds
    pub initial_ms: u64,
    /// Multiplier for each retry
    pub mult: f64,
    /// Maximum delay in milliseconds
    pub max_ms: u64,
    /// Maximum number of tries
    pub max_tries: u32,
}

impl Default for BackoffParams {
    fn default() -> Self {
        Self {
            initial_ms: 100,
            mult: 2.0,
            max_ms: 30_000,
            max_tries: MAX_ATTEMPTS,
        }
    }
}

impl BackoffParams {
    /// Delay before the retry following `backoff_ms` (0 on the first retry).
    fn next_delay(&self, backoff_ms: u64) -> u64 {
        if backoff_ms == 0 {
            self.initial_ms
        } else {
            ((backoff_ms as f64) * self.mult).min(self.max_ms as f64) as u64
        }
    }
}

/// Retry a function with exponential backoff.
///
/// Unlike a plain error retry, `should_retry` sees the whole outcome so that
/// successful responses carrying a transient status can be retried too. The
/// last outcome is returned once it is not retryable or tries are exhausted.
pub async fn retry_with_backoff<F, Fut, T, E, R>(
    mut f: F,
    should_retry: R,
    params: &BackoffParams,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&Result<T, E>) -> bool,
    E: std::fmt::Debug,
{
    let mut backoff_ms = 0u64;
    let mut tries = 0u32;

    loop {
        let outcome = f().await;
        tries += 1;

        if tries >= params.max_tries || !should_retry(&outcome) {
            if tries > 1 {
                debug!("Operation settled after {} attempts", tries);
            }
            return outcome;
        }

        backoff_ms = params.next_delay(backoff_ms);

        debug!(
            "Transient outcome on attempt {}, retrying in {} ms",
            tries, backoff_ms
        );

        sleep(Duration::from_millis(backoff_ms)).await;
    }
}

/// Baseline transient statuses: rate limiting and server errors other than 501.
pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
}

/// Portal retry policy for a received response.
///
/// 500 is always retried. 409 is retried for DELETE, where it signals a
/// concurrent server-side cleanup.
pub fn should_retry_status(method: &Method, status: StatusCode) -> bool {
    status == StatusCode::INTERNAL_SERVER_ERROR
        || is_transient_status(status)
        || (status == StatusCode::CONFLICT && *method == Method::DELETE)
}

/// Portal retry policy for a transport failure.
pub fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
