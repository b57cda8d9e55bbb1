//! HTTP client for the portal API.
//!
//! This module provides the CRUD primitives every resource call goes through:
//! header construction, the retrying transport, status interpretation and the
//! hand-off to provisioning tracking.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::metrics::{ClientMetrics, MetricsSnapshot};
use crate::sdk::credentials::{AuthMode, Authorization, Credentials};
use crate::sdk::provision::{JobKind, JobPoller, PollSettings};
use crate::sdk::resource::{Resource, ResourceApi};
use crate::sdk::session::{establish_session, SessionStore};
use crate::sdk::tenant::resolve_tenant_network;
use crate::sdk::transport::RetryingTransport;
use crate::sdk::types::*;

/// Characters escaped when a value is placed in a path segment or query.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a path segment or query value.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Append `key=value` to a URI that may already carry a query string.
pub fn with_query(uri: &str, key: &str, value: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}={}",
        uri,
        separator,
        encode_component(key),
        encode_component(value)
    )
}

/// Headers common to every portal request.
pub(crate) fn request_headers(auth: &Authorization, request_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    auth.apply(&mut headers);
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(HEADER_REQUEST_ID, value);
    }
    headers
}

/// A response read to completion.
struct Received {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    request_id: String,
}

impl Received {
    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    }

    fn into_status_error(self, operation: Operation, uri: &str) -> Error {
        Error::http_status(
            operation,
            uri,
            self.request_id,
            self.status.as_u16(),
            self.body,
        )
    }
}

#[derive(Debug)]
struct ClientInner {
    api_url: String,
    tenant_network_id: String,
    auth: Authorization,
    transport: RetryingTransport,
    provision: bool,
    poll: PollSettings,
    metrics: Arc<ClientMetrics>,
    /// Replaced by [`ApiClient::cancel_all`] after it fires.
    cancel: RwLock<CancellationToken>,
}

/// Authenticated portal client.
///
/// Cheap to clone; all clones share one transport, cookie jar and tenant
/// context. Nothing is mutated after [`ApiClient::connect`] returns except
/// the session cookie jar.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Authenticate, resolve the tenant network and build a client.
    ///
    /// Any failure here is fatal: no client is returned.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let credentials = Credentials::resolve(
            config.username.as_deref(),
            config.password.as_deref(),
            config.secret.as_deref(),
        )?;

        let api_url = config.portal_url.trim_end_matches('/').to_string();
        let metrics = ClientMetrics::new();
        let session = match config.auth_mode {
            AuthMode::Session => Some(SessionStore::new()),
            AuthMode::Header => None,
        };

        let transport =
            RetryingTransport::new(config.request_timeout, session.as_ref(), metrics.clone())?;

        let auth = match session {
            Some(store) => {
                establish_session(&transport, &api_url, &credentials).await?;
                Authorization::Session(store)
            }
            None => Authorization::header(&credentials)?,
        };

        let tenant_network_id = resolve_tenant_network(&transport, &api_url, &auth).await?;

        info!(
            "Connected to {} (tenant network {}, {:?} auth, provisioning {})",
            api_url,
            tenant_network_id,
            auth.mode(),
            if config.provision { "on" } else { "off" }
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                api_url,
                tenant_network_id,
                auth,
                transport,
                provision: config.provision,
                poll: config.poll_settings(),
                metrics,
                cancel: RwLock::new(CancellationToken::new()),
            }),
        })
    }

    /// Get the API base URL.
    pub fn api_url(&self) -> &str {
        &self.inner.api_url
    }

    /// Tenant-network id resolved at construction.
    pub fn tenant_network_id(&self) -> &str {
        &self.inner.tenant_network_id
    }

    /// Global provisioning switch.
    pub fn provisioning_enabled(&self) -> bool {
        self.inner.provision
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.inner.auth.mode()
    }

    /// Session cookie jar, in session mode only.
    pub fn session(&self) -> Option<&SessionStore> {
        self.inner.auth.session()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn metrics_prometheus(&self) -> String {
        self.inner.metrics.to_prometheus()
    }

    /// Current root token. Waits started by a [`ResourceApi`] without its own
    /// token run under a child of it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner
            .cancel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Abort every in-flight provisioning wait started from this client.
    ///
    /// The fired root is swapped for a fresh one, so later calls poll normally.
    pub fn cancel_all(&self) {
        let mut root = self
            .inner
            .cancel
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        root.cancel();
        *root = CancellationToken::new();
        info!("Cancelled in-flight provisioning waits");
    }

    // ===== URIs =====

    /// `{api}/tenantnetworks/{tenantNetworkId}/{kind}`
    pub fn tenant_uri(&self, kind: &str) -> String {
        format!(
            "{}/tenantnetworks/{}/{}",
            self.inner.api_url,
            encode_component(&self.inner.tenant_network_id),
            kind.trim_matches('/')
        )
    }

    /// `{api}/{kind}` for tenant-global resources.
    pub fn global_uri(&self, kind: &str) -> String {
        format!("{}/{}", self.inner.api_url, kind.trim_matches('/'))
    }

    /// Status URI of a provisioning or validation job.
    pub fn job_uri(&self, kind: JobKind, job_id: &str) -> String {
        format!(
            "{}/{}",
            self.tenant_uri(kind.path_segment()),
            encode_component(job_id)
        )
    }

    /// Typed resource facade rooted at `base_uri`.
    pub fn resource<T: Resource>(&self, base_uri: impl Into<String>, provision: bool) -> ResourceApi<T> {
        ResourceApi::new(self.clone(), base_uri.into(), provision)
    }

    // ===== CRUD Primitives =====

    /// GET; success is exactly 200.
    pub async fn get(&self, uri: &str) -> Result<Fetched> {
        let received = self.send(Operation::Get, uri, None).await?;

        if !Operation::Get.accepts(received.status) {
            self.inner.metrics.inc_http_failures();
            return Err(received.into_status_error(Operation::Get, uri));
        }

        Ok(Fetched {
            provision_state: received.header(HEADER_PROVISION_STATE),
            body: received.body,
            request_id: received.request_id,
        })
    }

    /// POST; success is 200 or 201.
    pub async fn create(
        &self,
        uri: &str,
        body: String,
        provision: bool,
        cancel: &CancellationToken,
    ) -> Result<Mutation<String>> {
        self.mutate(Operation::Create, uri, body, provision, cancel)
            .await
    }

    /// PUT; success is 200 or 202.
    pub async fn update(
        &self,
        uri: &str,
        body: String,
        provision: bool,
        cancel: &CancellationToken,
    ) -> Result<Mutation<String>> {
        self.mutate(Operation::Update, uri, body, provision, cancel)
            .await
    }

    /// DELETE; any 2xx succeeds and 404 means the resource is already gone.
    pub async fn delete(
        &self,
        uri: &str,
        provision: bool,
        cancel: &CancellationToken,
    ) -> Result<Deletion> {
        let provision = self.inner.provision && provision;
        let target = if provision {
            with_query(uri, "provision", "true")
        } else {
            uri.to_string()
        };

        let received = self.send(Operation::Delete, &target, None).await?;

        if received.status == StatusCode::NOT_FOUND {
            debug!("{} already absent (request {})", target, received.request_id);
            return Ok(Deletion {
                outcome: DeleteOutcome::AlreadyDeleted,
                request_id: received.request_id,
                provisioning: None,
            });
        }

        if !Operation::Delete.accepts(received.status) {
            self.inner.metrics.inc_http_failures();
            return Err(received.into_status_error(Operation::Delete, &target));
        }

        let provisioning = if provision {
            Some(
                self.track_provisioning(Operation::Delete, &target, &received, cancel)
                    .await?,
            )
        } else {
            None
        };

        Ok(Deletion {
            outcome: DeleteOutcome::Deleted,
            request_id: received.request_id,
            provisioning,
        })
    }

    /// Poll a validation job until it is terminal.
    ///
    /// `request_id` is that of the mutation which returned `job_id`.
    pub async fn await_validation(
        &self,
        job_id: &str,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        JobPoller::new(self, self.inner.poll)
            .wait(JobKind::Validation, job_id, Operation::Update, request_id, cancel)
            .await
    }

    async fn mutate(
        &self,
        operation: Operation,
        uri: &str,
        body: String,
        provision: bool,
        cancel: &CancellationToken,
    ) -> Result<Mutation<String>> {
        let provision = self.inner.provision && provision;
        let target = if provision {
            with_query(uri, "provision", "true")
        } else {
            uri.to_string()
        };

        let received = self.send(operation, &target, Some(&body)).await?;

        if !operation.accepts(received.status) {
            self.inner.metrics.inc_http_failures();
            return Err(received.into_status_error(operation, &target));
        }

        let provisioning = if provision {
            Some(
                self.track_provisioning(operation, &target, &received, cancel)
                    .await?,
            )
        } else {
            None
        };

        Ok(Mutation {
            validation_job_id: received.header(HEADER_VALIDATION_ID),
            body: received.body,
            request_id: received.request_id,
            provisioning,
        })
    }

    /// Follow the job named in the response headers.
    ///
    /// A missing job id is a protocol violation reported on the operation
    /// channel; everything the poller says goes into the report.
    async fn track_provisioning(
        &self,
        operation: Operation,
        uri: &str,
        received: &Received,
        cancel: &CancellationToken,
    ) -> Result<ProvisionReport> {
        let job_id = received
            .header(HEADER_PROVISION_ID)
            .ok_or_else(|| Error::MissingProvisionJobId {
                operation,
                uri: uri.to_string(),
                request_id: received.request_id.clone(),
            })?;

        let result = JobPoller::new(self, self.inner.poll)
            .wait(
                JobKind::Provision,
                &job_id,
                operation,
                &received.request_id,
                cancel,
            )
            .await;

        match &result {
            Ok(()) => self.inner.metrics.inc_provision_succeeded(),
            Err(e) if e.is_timeout() => self.inner.metrics.inc_provision_timed_out(),
            Err(_) => self.inner.metrics.inc_provision_failed(),
        }

        Ok(ProvisionReport::from_result(job_id, result))
    }

    /// Build and execute one request through the retrying transport.
    async fn send(&self, operation: Operation, uri: &str, body: Option<&str>) -> Result<Received> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("portal_request", operation = %operation, request_id = %request_id);

        async {
            let headers = request_headers(&self.inner.auth, &request_id);
            debug!("{} {}", operation.method(), uri);

            let transport_error = |source: reqwest::Error| Error::TransportFailed {
                operation,
                uri: uri.to_string(),
                request_id: request_id.clone(),
                source,
            };

            let response = self
                .inner
                .transport
                .execute(operation.method(), uri, &headers, body)
                .await
                .map_err(transport_error)?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await.map_err(transport_error)?;

            debug!("{} {} -> {}", operation.method(), uri, status.as_u16());

            Ok(Received {
                status,
                headers,
                body,
                request_id: request_id.clone(),
            })
        }
        .instrument(span)
        .await
    }
}
