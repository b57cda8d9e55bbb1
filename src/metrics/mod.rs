//! Request and provisioning counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector shared by every clone of a client.
#[derive(Debug, Default)]
pub struct ClientMetrics {
    /// HTTP attempts sent, retries included
    pub requests_total: AtomicU64,
    /// Attempts beyond the first for a call
    pub retries_total: AtomicU64,
    /// Calls rejected with a non-success status
    pub http_failures: AtomicU64,
    /// Provisioning jobs that reached SUCCESS
    pub provision_succeeded: AtomicU64,
    /// Provisioning jobs that failed or were cancelled
    pub provision_failed: AtomicU64,
    /// Provisioning jobs still running at the deadline
    pub provision_timed_out: AtomicU64,
}

impl ClientMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_retries(&self, count: u64) {
        self.retries_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_http_failures(&self) {
        self.http_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provision_succeeded(&self) {
        self.provision_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provision_failed(&self) {
        self.provision_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provision_timed_out(&self) {
        self.provision_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            retries_total: self.retries_total.load(Ordering::Relaxed),
            http_failures: self.http_failures.load(Ordering::Relaxed),
            provision_succeeded: self.provision_succeeded.load(Ordering::Relaxed),
            provision_failed: self.provision_failed.load(Ordering::Relaxed),
            provision_timed_out: self.provision_timed_out.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP portal_client_requests_total HTTP attempts sent, retries included
# TYPE portal_client_requests_total counter
portal_client_requests_total {}

# HELP portal_client_retries_total Retried attempts
# TYPE portal_client_retries_total counter
portal_client_retries_total {}

# HELP portal_client_http_failures_total Calls rejected by the portal
# TYPE portal_client_http_failures_total counter
portal_client_http_failures_total {}

# HELP portal_client_provision_jobs_total Provisioning jobs by outcome
# TYPE portal_client_provision_jobs_total counter
portal_client_provision_jobs_total{{outcome="success"}} {}
portal_client_provision_jobs_total{{outcome="failed"}} {}
portal_client_provision_jobs_total{{outcome="timed_out"}} {}
"#,
            s.requests_total,
            s.retries_total,
            s.http_failures,
            s.provision_succeeded,
            s.provision_failed,
            s.provision_timed_out
        )
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub retries_total: u64,
    pub http_failures: u64,
    pub provision_succeeded: u64,
    pub provision_failed: u64,
    pub provision_timed_out: u64,
}

/// Timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
