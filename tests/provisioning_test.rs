//! Provisioning poll lifecycle tests against a scripted job endpoint.

mod common;

use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{config, connect, hits, portal, tenant_path};
use portal_client::resources::{IpBlocks, Segment};
use portal_client::sdk::{JobState, Operation, ProvisionOutcome};
use portal_client::{ApiClient, ClientConfig, Error, ErrorKind};

fn segment(name: &str) -> Segment {
    Segment {
        id: None,
        name: name.to_string(),
        asn: 65_001,
        ip_blocks: IpBlocks {
            values: vec!["10.1.0.0/16".to_string()],
        },
        ..Segment::default()
    }
}

/// Accept a provisioning-enabled write and hand back `job_id`.
async fn mount_write(server: &MockServer, verb: &str, rest: &str, status: u16, job_id: &str) {
    Mock::given(method(verb))
        .and(path(tenant_path(rest).as_str()))
        .and(query_param("provision", "true"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("x-provision-request-id", job_id)
                .set_body_json(json!({
                    "id": 12,
                    "name": "corp",
                    "asn": 65001,
                    "ipBlocks": {"values": ["10.1.0.0/16"]}
                })),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Script a job: `first` for `times` polls, then `then` forever.
async fn mount_job(server: &MockServer, job_id: &str, first: &str, times: u64, then: &str) {
    let job_path = tenant_path(&format!("provision-requests/{}", job_id));
    Mock::given(method("GET"))
        .and(path(job_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": job_id, "state": first})))
        .up_to_n_times(times)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(job_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": job_id, "state": then})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_waits_for_success() {
    let server = portal().await;
    mount_write(&server, "POST", "segments", 201, "job-1").await;
    mount_job(&server, "job-1", "IN_PROGRESS", 2, "SUCCESS").await;

    let client = connect(&server, true).await;
    let created = client.segments().create(&segment("corp")).await.unwrap();

    assert_eq!(created.body.as_ref().unwrap().id, Some(12));
    assert_eq!(created.provision_outcome(), Some(ProvisionOutcome::Success));
    assert!(created.provisioning_error().is_none());
    assert_eq!(created.provisioning.as_ref().unwrap().job_id, "job-1");
    assert_eq!(
        hits(&server, &tenant_path("provision-requests/job-1")).await,
        3
    );
    assert_eq!(client.metrics().provision_succeeded, 1);
}

#[tokio::test]
async fn test_failed_job_reports_reason_but_keeps_body() {
    let server = portal().await;
    mount_write(&server, "POST", "segments", 200, "job-2").await;
    Mock::given(method("GET"))
        .and(path(tenant_path("provision-requests/job-2").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"state": "FAILED", "failureReason": "cxp capacity"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server, true).await;
    let created = client.segments().create(&segment("corp")).await.unwrap();

    assert_eq!(created.body.as_ref().unwrap().name, "corp");
    assert_eq!(created.provision_outcome(), Some(ProvisionOutcome::Failed));
    let err = created.provisioning_error().unwrap();
    assert_eq!(err.kind(), ErrorKind::Provisioning);
    assert!(!err.is_timeout());
    assert!(err.to_string().contains("job-2"));
    assert!(err.to_string().contains("cxp capacity"));
}

#[tokio::test]
async fn test_partial_success_fails_create() {
    let server = portal().await;
    mount_write(&server, "POST", "segments", 201, "job-3").await;
    mount_job(&server, "job-3", "IN_PROGRESS", 1, "PARTIAL_SUCCESS").await;

    let client = connect(&server, true).await;
    let created = client.segments().create(&segment("corp")).await.unwrap();

    assert_eq!(created.provision_outcome(), Some(ProvisionOutcome::Failed));
    assert!(matches!(
        created.provisioning_error(),
        Some(Error::ProvisioningFailed { job_id, .. }) if job_id == "job-3"
    ));
}

#[tokio::test]
async fn test_partial_success_keeps_update_polling() {
    let server = portal().await;
    mount_write(&server, "PUT", "segments/12", 202, "job-4").await;
    mount_job(&server, "job-4", "PARTIAL_SUCCESS", 3, "SUCCESS").await;

    let client = connect(&server, true).await;
    let updated = client
        .segments()
        .update("12", &segment("corp"))
        .await
        .unwrap();

    assert_eq!(updated.provision_outcome(), Some(ProvisionOutcome::Success));
    assert_eq!(
        hits(&server, &tenant_path("provision-requests/job-4")).await,
        4
    );
}

#[tokio::test]
async fn test_unfinished_job_times_out_as_failed() {
    let server = portal().await;
    mount_write(&server, "POST", "segments", 201, "job-5").await;
    mount_job(&server, "job-5", "IN_PROGRESS", 1, "IN_PROGRESS").await;

    let config = ClientConfig {
        provision: true,
        provision_timeout: Duration::from_millis(80),
        ..config(&server)
    };
    let client = ApiClient::connect(&config).await.unwrap();
    let created = client.segments().create(&segment("corp")).await.unwrap();

    assert_eq!(created.body.as_ref().unwrap().id, Some(12));
    assert_eq!(created.provision_outcome(), Some(ProvisionOutcome::Failed));
    let err = created.provisioning_error().unwrap();
    assert!(err.is_timeout());
    assert!(matches!(err, Error::ProvisioningTimedOut { job_id, .. } if job_id == "job-5"));
    assert_eq!(client.metrics().provision_timed_out, 1);
}

#[tokio::test]
async fn test_missing_job_id_is_an_operation_error() {
    let server = portal().await;
    Mock::given(method("POST"))
        .and(path(tenant_path("segments").as_str()))
        .and(query_param("provision", "true"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 12, "name": "corp"})))
        .mount(&server)
        .await;

    let client = connect(&server, true).await;
    let err = client
        .segments()
        .create(&segment("corp"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingProvisionJobId { .. }));
    assert_eq!(err.kind(), ErrorKind::Operation);
}

#[tokio::test]
async fn test_cancellation_stops_waiting() {
    let server = portal().await;
    mount_write(&server, "POST", "segments", 201, "job-6").await;
    mount_job(&server, "job-6", "IN_PROGRESS", 1, "IN_PROGRESS").await;

    let client = connect(&server, true).await;
    let token = CancellationToken::new();
    let segments = client.segments().with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
    });

    let created = segments.create(&segment("corp")).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(created.provision_outcome(), Some(ProvisionOutcome::Failed));
    assert!(matches!(
        created.provisioning_error(),
        Some(Error::ProvisioningCancelled { job_id, .. }) if job_id == "job-6"
    ));
}

#[tokio::test]
async fn test_cancel_all_stops_waits_but_not_later_calls() {
    let server = portal().await;
    let segments_path = tenant_path("segments");
    Mock::given(method("POST"))
        .and(path(segments_path.as_str()))
        .respond_with(ResponseTemplate::new(201).insert_header("x-provision-request-id", "job-7"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(segments_path.as_str()))
        .respond_with(ResponseTemplate::new(201).insert_header("x-provision-request-id", "job-9"))
        .mount(&server)
        .await;
    mount_job(&server, "job-7", "IN_PROGRESS", 1, "IN_PROGRESS").await;
    mount_job(&server, "job-9", "IN_PROGRESS", 1, "SUCCESS").await;

    let client = connect(&server, true).await;
    let segments = client.segments();

    let canceller = {
        let client = client.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            client.cancel_all();
        })
    };
    let first = segments.create(&segment("corp")).await.unwrap();
    canceller.await.unwrap();

    assert!(matches!(
        first.provisioning_error(),
        Some(Error::ProvisioningCancelled { job_id, .. }) if job_id == "job-7"
    ));

    // Both the existing facade and a fresh one poll normally afterwards.
    let second = segments.create(&segment("corp")).await.unwrap();
    assert_eq!(second.provision_outcome(), Some(ProvisionOutcome::Success));
    let third = client.segments().create(&segment("corp")).await.unwrap();
    assert_eq!(third.provision_outcome(), Some(ProvisionOutcome::Success));
    assert!(hits(&server, &tenant_path("provision-requests/job-9")).await >= 2);
}

#[tokio::test]
async fn test_undecodable_body_keeps_provisioning_report() {
    let server = portal().await;
    Mock::given(method("POST"))
        .and(path(tenant_path("segments").as_str()))
        .and(query_param("provision", "true"))
        .respond_with(ResponseTemplate::new(201).insert_header("x-provision-request-id", "job-10"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(tenant_path("provision-requests/job-10").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"state": "FAILED", "message": "segment overlaps"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server, true).await;
    let created = client.segments().create(&segment("corp")).await.unwrap();

    let decode_err = created.body.as_ref().unwrap_err();
    assert!(matches!(decode_err, Error::UnmarshalFailed { .. }));

    assert_eq!(created.provision_outcome(), Some(ProvisionOutcome::Failed));
    let provisioning_err = created.provisioning_error().unwrap();
    assert_eq!(provisioning_err.kind(), ErrorKind::Provisioning);
    assert!(provisioning_err.to_string().contains("segment overlaps"));
}

#[tokio::test]
async fn test_provisioning_errors_name_operation_and_request() {
    let server = portal().await;
    mount_write(&server, "PUT", "segments/12", 202, "job-11").await;
    mount_job(&server, "job-11", "IN_PROGRESS", 1, "FAILED").await;

    let client = connect(&server, true).await;
    let updated = client
        .segments()
        .update("12", &segment("corp"))
        .await
        .unwrap();

    let message = updated.provisioning_error().unwrap().to_string();
    assert!(message.starts_with("UPDATE provisioning failed for job job-11"));
    assert!(message.contains(&format!("(request {})", updated.request_id)));
    assert!(matches!(
        updated.provisioning_error(),
        Some(Error::ProvisioningFailed { operation: Operation::Update, request_id, .. })
            if *request_id == updated.request_id
    ));
}

#[tokio::test]
async fn test_delete_with_provisioning() {
    let server = portal().await;
    Mock::given(method("DELETE"))
        .and(path(tenant_path("segments/12").as_str()))
        .and(query_param("provision", "true"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-provision-request-id", "job-8"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-8", "IN_PROGRESS", 1, "SUCCESS").await;

    let client = connect(&server, true).await;
    let deleted = client.segments().delete("12").await.unwrap();

    let report = deleted.provisioning.expect("provisioning report");
    assert!(report.succeeded());
    assert_eq!(report.job_id, "job-8");
}

#[tokio::test]
async fn test_get_exposes_provision_state_header() {
    let server = portal().await;
    Mock::given(method("GET"))
        .and(path(tenant_path("segments/12").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-provision-request-state", "IN_PROGRESS")
                .set_body_json(json!({"id": 12, "name": "corp"})),
        )
        .mount(&server)
        .await;

    let client = connect(&server, false).await;
    let fetched = client.get(&client.tenant_uri("segments/12")).await.unwrap();

    assert_eq!(fetched.provision_state.as_deref(), Some("IN_PROGRESS"));
    assert_eq!(fetched.job_state(), Some(JobState::InProgress));
}

#[tokio::test]
async fn test_validation_job_is_polled_like_provisioning() {
    let server = portal().await;
    Mock::given(method("PUT"))
        .and(path(tenant_path("segments/12").as_str()))
        .respond_with(ResponseTemplate::new(200).insert_header("x-ak-validation-state-id", "val-1"))
        .mount(&server)
        .await;
    let validation_path = tenant_path("validation-requests/val-1");
    Mock::given(method("GET"))
        .and(path(validation_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "IN_PROGRESS"})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(validation_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "SUCCESS"})))
        .mount(&server)
        .await;

    let client = connect(&server, false).await;
    let updated = client
        .segments()
        .update("12", &segment("corp"))
        .await
        .unwrap();

    assert!(updated.provisioning.is_none());
    let job_id = updated.validation_job_id.expect("validation job id");
    client
        .await_validation(&job_id, &updated.request_id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(hits(&server, &validation_path).await, 2);
}
