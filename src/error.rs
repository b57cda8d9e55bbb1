//! Error types for the portal client.

use thiserror::Error;

use crate::sdk::types::Operation;

/// Result type alias for portal client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which stage of the request lifecycle produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client construction failed; no client exists.
    Construction,
    /// The HTTP operation itself did not complete as requested.
    Operation,
    /// The write happened but provisioning did not confirm it.
    Provisioning,
}

/// Main error type for the portal client.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Construction Errors =====
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Tenant network resolution failed: {0}")]
    TenantResolutionFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ===== Payload Errors =====
    #[error("Failed to marshal {resource}: {source}")]
    MarshalFailed {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to unmarshal {resource}: {source}")]
    UnmarshalFailed {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },

    // ===== HTTP Errors =====
    #[error("{operation} {uri} failed (request {request_id}): {source}")]
    TransportFailed {
        operation: Operation,
        uri: String,
        request_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} {uri} returned {status} (request {request_id}): {body}")]
    HttpStatus {
        operation: Operation,
        uri: String,
        request_id: String,
        status: u16,
        body: String,
    },

    #[error("{operation} {uri} requested provisioning but no provision request id was returned (request {request_id})")]
    MissingProvisionJobId {
        operation: Operation,
        uri: String,
        request_id: String,
    },

    // ===== Provisioning Errors =====
    #[error("{operation} provisioning failed for job {job_id} (request {request_id}): {reason}")]
    ProvisioningFailed {
        operation: Operation,
        job_id: String,
        request_id: String,
        reason: String,
    },

    #[error("{operation} provisioning timed out for job {job_id} after {seconds} seconds (request {request_id})")]
    ProvisioningTimedOut {
        operation: Operation,
        job_id: String,
        request_id: String,
        seconds: u64,
    },

    #[error("{operation} provisioning wait cancelled for job {job_id} (request {request_id})")]
    ProvisioningCancelled {
        operation: Operation,
        job_id: String,
        request_id: String,
    },

    // ===== Lookup Errors =====
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Expected exactly one resource named '{name}', found {count}")]
    AmbiguousOrMissingResource { name: String, count: usize },

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create an HTTP status error from response details.
    pub fn http_status(
        operation: Operation,
        uri: impl Into<String>,
        request_id: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::HttpStatus {
            operation,
            uri: uri.into(),
            request_id: request_id.into(),
            status,
            body: body.into(),
        }
    }

    /// Classify the error by lifecycle stage.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials(_)
            | Self::AuthenticationFailed(_)
            | Self::TenantResolutionFailed(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Yaml(_) => ErrorKind::Construction,
            Self::ProvisioningFailed { .. }
            | Self::ProvisioningTimedOut { .. }
            | Self::ProvisioningCancelled { .. } => ErrorKind::Provisioning,
            _ => ErrorKind::Operation,
        }
    }

    /// HTTP status carried by the error, if the server rejected the call.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the server reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this error reports a provisioning deadline rather than a job failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ProvisioningTimedOut { .. })
    }
}
