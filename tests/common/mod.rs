//! Shared scaffolding for tests that run against a scripted portal.

#![allow(dead_code)]

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use portal_client::{ApiClient, ClientConfig};

pub const TENANT_NETWORK_ID: &str = "4521";

/// Start a portal that answers tenant-network discovery.
pub async fn portal() -> MockServer {
    let server = MockServer::start().await;
    mount_tenant_networks(&server).await;
    server
}

pub async fn mount_tenant_networks(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/tenantnetworks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 4521, "name": "corp"}, {"id": 9000, "name": "lab"}])),
        )
        .mount(server)
        .await;
}

/// Header-mode config with fast polling.
pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        portal_url: format!("{}/api", server.uri()),
        secret: Some("token".to_string()),
        poll_interval: Duration::from_millis(10),
        provision_timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    }
}

pub async fn connect(server: &MockServer, provision: bool) -> ApiClient {
    let config = ClientConfig {
        provision,
        ..config(server)
    };
    ApiClient::connect(&config)
        .await
        .expect("client should connect")
}

/// Path of a tenant-scoped collection or item.
pub fn tenant_path(rest: &str) -> String {
    format!("/api/tenantnetworks/{}/{}", TENANT_NETWORK_ID, rest)
}

/// Count requests the server saw for `path`.
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}
