//! Tenant-network discovery performed once at client construction.

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::sdk::api_client::request_headers;
use crate::sdk::credentials::Authorization;
use crate::sdk::transport::RetryingTransport;
use crate::sdk::types::Operation;

/// One entry of the tenant-network summary list.
#[derive(Debug, Deserialize)]
struct TenantNetworkSummary {
    id: Option<Value>,
}

/// Fetch the caller's tenant-network id from the summary endpoint.
pub async fn resolve_tenant_network(
    transport: &RetryingTransport,
    api_url: &str,
    auth: &Authorization,
) -> Result<String> {
    let url = format!("{}/tenantnetworks", api_url);
    let request_id = Uuid::new_v4().to_string();
    let headers = request_headers(auth, &request_id);

    let response = transport
        .execute(Method::GET, &url, &headers, None)
        .await
        .map_err(|e| {
            Error::TenantResolutionFailed(format!("request {} failed: {}", request_id, e))
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        Error::TenantResolutionFailed(format!("response {} unreadable: {}", request_id, e))
    })?;

    if !Operation::Get.accepts(status) {
        return Err(Error::TenantResolutionFailed(format!(
            "{} returned {} (request {}): {}",
            url,
            status.as_u16(),
            request_id,
            body
        )));
    }

    let id = first_tenant_network_id(&body)?;
    info!("Resolved tenant network {}", id);
    Ok(id)
}

/// Extract the first entry's id, accepting numeric or string ids.
fn first_tenant_network_id(body: &str) -> Result<String> {
    let networks: Vec<TenantNetworkSummary> = serde_json::from_str(body).map_err(|e| {
        Error::TenantResolutionFailed(format!("unexpected summary payload: {}", e))
    })?;

    let first = networks
        .into_iter()
        .next()
        .ok_or_else(|| Error::TenantResolutionFailed("no tenant networks found".to_string()))?;

    match first.id {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        other => Err(Error::TenantResolutionFailed(format!(
            "tenant network has no usable id: {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_ids() {
        assert_eq!(
            first_tenant_network_id(r#"[{"id": 4521, "name": "corp"}, {"id": 9}]"#).unwrap(),
            "4521"
        );
        assert_eq!(
            first_tenant_network_id(r#"[{"id": "tn-7"}]"#).unwrap(),
            "tn-7"
        );
    }

    #[test]
    fn test_empty_or_malformed_summary() {
        for body in ["[]", r#"[{"name": "corp"}]"#, r#"[{"id": ""}]"#, r#"{"id": 1}"#, ""] {
            let err = first_tenant_network_id(body).unwrap_err();
            assert!(
                matches!(err, Error::TenantResolutionFailed(_)),
                "body {:?} gave {:?}",
                body,
                err
            );
        }
    }
}
