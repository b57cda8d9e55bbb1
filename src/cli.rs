//! Subcommand execution. Results are printed to stdout as JSON.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use tracing::warn;

use portal_client::config::Command;
use portal_client::sdk::ProvisionReport;
use portal_client::{ApiClient, ResourceApi};

/// Schemaless facade for `kind`, tenant-scoped unless `global`.
fn resource_api(client: &ApiClient, kind: &str, global: bool, provision: bool) -> ResourceApi<Value> {
    let base = if global {
        client.global_uri(kind)
    } else {
        client.tenant_uri(kind)
    };
    client.resource(base, provision)
}

fn read_payload(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Body text as JSON when it parses, as a string otherwise.
fn body_value(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the result and fail if provisioning did not confirm it.
fn finish(resource: Value, provisioning: Option<ProvisionReport>) -> Result<()> {
    let summary = provisioning.as_ref().map(|p| {
        json!({
            "job_id": p.job_id,
            "outcome": p.outcome,
            "error": p.error.as_ref().map(|e| e.to_string()),
        })
    });
    print_json(&json!({ "resource": resource, "provisioning": summary }))?;

    match provisioning {
        Some(ProvisionReport {
            job_id,
            error: Some(e),
            ..
        }) => Err(anyhow!(e).context(format!("Provisioning job {} did not confirm the change", job_id))),
        _ => Ok(()),
    }
}

pub async fn run(client: &ApiClient, command: Command) -> Result<()> {
    match command {
        Command::Tenant => print_json(&json!({
            "tenant_network_id": client.tenant_network_id(),
            "api_url": client.api_url(),
        })),
        Command::List { kind, global } => {
            let body = resource_api(client, &kind, global, false).get_all().await?;
            print_json(&body_value(&body))
        }
        Command::Get {
            kind,
            id,
            name,
            global,
        } => {
            let api = resource_api(client, &kind, global, false);
            let resource = match (id, name) {
                (Some(id), _) => api.get_by_id(&id).await?,
                (None, Some(name)) => api.get_by_name(&name).await?,
                (None, None) => bail!("either --id or --name is required"),
            };
            print_json(&resource)
        }
        Command::Create {
            kind,
            file,
            global,
            no_provision,
        } => {
            let payload = read_payload(&file)?;
            let created = resource_api(client, &kind, global, !no_provision)
                .create(&payload)
                .await?;
            let resource = created.body.unwrap_or_else(|e| {
                warn!("Created resource could not be decoded: {}", e);
                Value::Null
            });
            finish(resource, created.provisioning)
        }
        Command::Update {
            kind,
            id,
            file,
            global,
            no_provision,
        } => {
            let payload = read_payload(&file)?;
            let updated = resource_api(client, &kind, global, !no_provision)
                .update(&id, &payload)
                .await?;
            finish(body_value(&updated.body), updated.provisioning)
        }
        Command::Delete {
            kind,
            id,
            global,
            no_provision,
        } => {
            let deleted = resource_api(client, &kind, global, !no_provision)
                .delete(&id)
                .await?;
            finish(json!({ "id": id, "outcome": deleted.outcome }), deleted.provisioning)
        }
    }
}
