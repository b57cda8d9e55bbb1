//! Wire-level and result types shared by the request lifecycle.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Per-call trace id sent with every request.
pub const HEADER_REQUEST_ID: &str = "x-ak-request-id";
/// Immediate provisioning state hint returned on GET.
pub const HEADER_PROVISION_STATE: &str = "x-provision-request-state";
/// Provisioning job id returned by provisioning-enabled writes.
pub const HEADER_PROVISION_ID: &str = "x-provision-request-id";
/// Validation job id returned by writes that trigger validation.
pub const HEADER_VALIDATION_ID: &str = "x-ak-validation-state-id";

/// The four CRUD verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// HTTP method used for this operation.
    pub fn method(&self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Create => Method::POST,
            Self::Update => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }

    /// Check whether a status counts as success for this operation.
    ///
    /// DELETE's 404 handling lives with the delete primitive, not here.
    pub fn accepts(&self, status: StatusCode) -> bool {
        match self {
            Self::Get => status == StatusCode::OK,
            Self::Create => status == StatusCode::OK || status == StatusCode::CREATED,
            Self::Update => status == StatusCode::OK || status == StatusCode::ACCEPTED,
            Self::Delete => status.is_success(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-reported state of a provisioning or validation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    InProgress,
    Success,
    Failed,
    PartialSuccess,
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// Parse a state string as it appears in headers or status bodies.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => Self::InProgress,
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            "PARTIAL_SUCCESS" => Self::PartialSuccess,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::PartialSuccess => "PARTIAL_SUCCESS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Outcome tag reported to callers once provisioning tracking ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisionOutcome {
    Success,
    Failed,
}

impl ProvisionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of tracking one provisioning job.
///
/// The error is independent of the HTTP result that triggered the job: a
/// report with an error still means the write itself was accepted.
#[derive(Debug)]
pub struct ProvisionReport {
    pub job_id: String,
    pub outcome: ProvisionOutcome,
    pub error: Option<Error>,
}

impl ProvisionReport {
    pub(crate) fn from_result(job_id: String, result: Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                job_id,
                outcome: ProvisionOutcome::Success,
                error: None,
            },
            Err(e) => Self {
                job_id,
                outcome: ProvisionOutcome::Failed,
                error: Some(e),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == ProvisionOutcome::Success
    }

    /// Collapse into a single result, discarding the job id.
    pub fn into_result(self) -> Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Response of a successful GET.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,
    pub request_id: String,
    /// Raw `x-provision-request-state` header value, if present.
    pub provision_state: Option<String>,
}

impl Fetched {
    pub fn job_state(&self) -> Option<JobState> {
        self.provision_state.as_deref().map(JobState::from_wire)
    }
}

/// Response of a successful create or update.
#[derive(Debug)]
pub struct Mutation<B> {
    pub body: B,
    pub request_id: String,
    pub validation_job_id: Option<String>,
    /// `None` unless provisioning was both enabled on the client and requested by the call.
    pub provisioning: Option<ProvisionReport>,
}

impl<B> Mutation<B> {
    /// Convert the body, keeping the provisioning channel untouched.
    ///
    /// The conversion cannot fail the mutation: a decode error belongs in `U`
    /// so the provisioning report still reaches the caller.
    pub fn map_body<U, F>(self, f: F) -> Mutation<U>
    where
        F: FnOnce(B) -> U,
    {
        Mutation {
            body: f(self.body),
            request_id: self.request_id,
            validation_job_id: self.validation_job_id,
            provisioning: self.provisioning,
        }
    }

    /// Provisioning error, if tracking ran and did not confirm the write.
    pub fn provisioning_error(&self) -> Option<&Error> {
        self.provisioning.as_ref().and_then(|p| p.error.as_ref())
    }

    pub fn provision_outcome(&self) -> Option<ProvisionOutcome> {
        self.provisioning.as_ref().map(|p| p.outcome)
    }
}

/// How a delete call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// Server returned 404; treated as an idempotent success.
    AlreadyDeleted,
}

/// Response of a successful delete.
#[derive(Debug)]
pub struct Deletion {
    pub outcome: DeleteOutcome,
    pub request_id: String,
    pub provisioning: Option<ProvisionReport>,
}

impl Deletion {
    pub fn provisioning_error(&self) -> Option<&Error> {
        self.provisioning.as_ref().and_then(|p| p.error.as_ref())
    }
}
