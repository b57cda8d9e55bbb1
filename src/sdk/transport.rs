//! Retrying HTTP transport shared by every portal call.

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};
use crate::metrics::ClientMetrics;
use crate::sdk::retry::{retry_with_backoff, should_retry_error, should_retry_status, BackoffParams};
use crate::sdk::session::SessionStore;
use crate::VERSION;

/// User agent string for API requests.
fn user_agent() -> String {
    format!("portal-client/{} (rust)", VERSION)
}

/// reqwest client wrapped in the portal retry policy.
#[derive(Debug, Clone)]
pub struct RetryingTransport {
    client: Client,
    params: BackoffParams,
    metrics: Arc<ClientMetrics>,
}

impl RetryingTransport {
    /// Create a transport. A session store, when given, becomes the cookie provider.
    pub fn new(
        request_timeout: Duration,
        session: Option<&SessionStore>,
        metrics: Arc<ClientMetrics>,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(user_agent())
            .timeout(request_timeout);

        if let Some(store) = session {
            builder = builder.cookie_provider(store.jar());
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            params: BackoffParams::default(),
            metrics,
        })
    }

    /// Send a request, retrying transient outcomes.
    ///
    /// Returns the last response whatever its status; only a transport
    /// failure on the final attempt surfaces as an error.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&str>,
    ) -> std::result::Result<Response, reqwest::Error> {
        let mut attempts = 0u32;

        let outcome = retry_with_backoff(
            || {
                attempts += 1;
                self.metrics.inc_requests();

                let mut request = self
                    .client
                    .request(method.clone(), url)
                    .headers(headers.clone());
                if let Some(body) = body {
                    request = request.body(body.to_owned());
                }

                async move { request.send().await }
            },
            |outcome| match outcome {
                Ok(response) => should_retry_status(&method, response.status()),
                Err(e) => should_retry_error(e),
            },
            &self.params,
        )
        .await;

        if attempts > 1 {
            self.metrics.add_retries(u64::from(attempts - 1));
            warn!("{} {} needed {} attempts", method, url, attempts);
        }

        outcome
    }
}
