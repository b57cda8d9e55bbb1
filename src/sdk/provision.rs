//! Provisioning and validation job tracking.
//!
//! A provisioning-enabled write returns a job id; the poller fetches the job
//! state on a fixed interval until it is terminal, the deadline passes, or the
//! caller cancels. The poller only reports; it never compensates.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metrics::Timer;
use crate::sdk::api_client::ApiClient;
use crate::sdk::types::{JobState, Operation};

/// Delay between job status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Overall deadline measured from the start of polling (240 minutes).
pub const DEFAULT_PROVISION_TIMEOUT: Duration = Duration::from_secs(240 * 60);

/// Which asynchronous workflow a job id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Provision,
    Validation,
}

impl JobKind {
    /// Collection under the tenant network holding jobs of this kind.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Provision => "provision-requests",
            Self::Validation => "validation-requests",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provision => f.write_str("provision"),
            Self::Validation => f.write_str("validation"),
        }
    }
}

/// Poll cadence and deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_PROVISION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Succeeded,
    Failed,
}

/// Transition rule for one observed state.
///
/// PARTIAL_SUCCESS ends a create as a failure but keeps update and delete
/// polling; validation jobs only know SUCCESS and FAILED.
fn classify(kind: JobKind, operation: Operation, state: &JobState) -> Step {
    match (state, kind, operation) {
        (JobState::Success, _, _) => Step::Succeeded,
        (JobState::Failed, _, _) => Step::Failed,
        (JobState::PartialSuccess, JobKind::Provision, Operation::Create) => Step::Failed,
        _ => Step::Continue,
    }
}

/// Job status document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: JobState,
    #[serde(default, alias = "failureReason")]
    message: Option<String>,
}

/// Blocking poll loop run on the caller's task.
pub struct JobPoller<'a> {
    client: &'a ApiClient,
    settings: PollSettings,
}

impl<'a> JobPoller<'a> {
    pub fn new(client: &'a ApiClient, settings: PollSettings) -> Self {
        Self { client, settings }
    }

    /// Poll `job_id` until it is terminal.
    ///
    /// `request_id` names the call that started the job and is carried into
    /// every error. Failed status fetches are logged and retried on the next
    /// tick; only the deadline or the token ends the loop without a terminal
    /// state.
    pub async fn wait(
        &self,
        kind: JobKind,
        job_id: &str,
        operation: Operation,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let timer = Timer::start();
        let deadline = Instant::now() + self.settings.timeout;
        let uri = self.client.job_uri(kind, job_id);
        let mut polls = 0u32;

        info!("Waiting for {} job {} ({})", kind, job_id, operation);

        loop {
            let wake = (Instant::now() + self.settings.interval).min(deadline);
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("Stopped waiting for {} job {} after {} polls", kind, job_id, polls);
                    return Err(Error::ProvisioningCancelled {
                        operation,
                        job_id: job_id.to_string(),
                        request_id: request_id.to_string(),
                    });
                }
                _ = sleep_until(wake) => {}
            }

            polls += 1;
            match self.fetch_status(&uri).await {
                Ok(status) => match classify(kind, operation, &status.state) {
                    Step::Succeeded => {
                        info!(
                            "{} job {} succeeded after {:.1}s",
                            kind,
                            job_id,
                            timer.elapsed_secs()
                        );
                        return Ok(());
                    }
                    Step::Failed => {
                        warn!("{} job {} ended in {}", kind, job_id, status.state.as_str());
                        let reason = status.message.unwrap_or_else(|| {
                            format!("{} job reported {}", kind, status.state.as_str())
                        });
                        return Err(Error::ProvisioningFailed {
                            operation,
                            job_id: job_id.to_string(),
                            request_id: request_id.to_string(),
                            reason,
                        });
                    }
                    Step::Continue => {
                        debug!("{} job {} is {} (poll {})", kind, job_id, status.state.as_str(), polls);
                    }
                },
                Err(e) => warn!("Polling {} job {} failed: {}", kind, job_id, e),
            }

            if Instant::now() >= deadline {
                warn!(
                    "{} job {} not terminal after {}s",
                    kind,
                    job_id,
                    self.settings.timeout.as_secs()
                );
                return Err(Error::ProvisioningTimedOut {
                    operation,
                    job_id: job_id.to_string(),
                    request_id: request_id.to_string(),
                    seconds: self.settings.timeout.as_secs(),
                });
            }
        }
    }

    /// Fetch the job status, falling back to the state header when the body
    /// does not carry one.
    async fn fetch_status(&self, uri: &str) -> Result<JobStatus> {
        let fetched = self.client.get(uri).await?;

        match serde_json::from_str::<JobStatus>(&fetched.body) {
            Ok(status) => Ok(status),
            Err(e) => match fetched.job_state() {
                Some(state) => Ok(JobStatus {
                    state,
                    message: None,
                }),
                None => Err(Error::UnmarshalFailed {
                    resource: "job status",
                    source: e,
                }),
            },
        }
    }
}
