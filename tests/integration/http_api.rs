//! HTTP field client against a mock server

use assert_matches::assert_matches;
use serde_json::json;
use sitesync::client::api_client::{ApiError, HttpSiteApi, SiteApi, WriteRequest, IDEMPOTENCY_HEADER};
use sitesync::client::config::Config;
use sitesync::client::local_db::LocalDatabase;
use sitesync::client::offline::{OfflineEngine, SubmitResult};
use sitesync::client::sync::ConnectivityMonitor;
use sitesync::shared::{AttendancePayload, RecordType, SyncConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let sync = SyncConfig::builder()
        .server_url(server.uri())
        .request_timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let mut config = Config::from_sync_config(sync);
    config.set_token(Some("field-token".to_string()));
    config
}

fn write_request(record_type: RecordType, payload: serde_json::Value) -> WriteRequest {
    WriteRequest {
        idempotency_key: Uuid::new_v4(),
        record_type,
        payload,
    }
}

#[tokio::test]
async fn test_write_sends_idempotency_key_and_token() {
    let server = MockServer::start().await;
    let request = write_request(
        RecordType::Attendance,
        serde_json::to_value(AttendancePayload::check_in("P1", 12.9, 77.6)).unwrap(),
    );

    Mock::given(method("POST"))
        .and(path("/api/attendance/check-in"))
        .and(header(IDEMPOTENCY_HEADER, request.idempotency_key.to_string().as_str()))
        .and(header("Authorization", "Bearer field-token"))
        .and(body_partial_json(json!({"projectId": "P1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 501, "projectId": "P1"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpSiteApi::new(config_for(&server)).unwrap();
    let ack = api.write(request).await.unwrap();

    assert_eq!(ack.record["id"], 501);
    assert!(!ack.replayed);
}

#[tokio::test]
async fn test_conflict_means_already_applied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/material-requests"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"record": {"id": 77}})))
        .mount(&server)
        .await;

    let api = HttpSiteApi::new(config_for(&server)).unwrap();
    let ack = api
        .write(write_request(RecordType::MaterialRequest, json!({})))
        .await
        .unwrap();

    assert!(ack.replayed);
    assert_eq!(ack.record["id"], 77);
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dpr"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/approvals"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "comment required"})))
        .mount(&server)
        .await;

    let api = HttpSiteApi::new(config_for(&server)).unwrap();

    let result = api.write(write_request(RecordType::Dpr, json!({}))).await;
    assert_matches!(result, Err(ApiError::Transient(_)));

    let result = api.write(write_request(RecordType::Approval, json!({}))).await;
    assert_eq!(
        result,
        Err(ApiError::Rejected {
            status: 422,
            message: "comment required".to_string()
        })
    );
}

#[tokio::test]
async fn test_slow_server_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dpr"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let api = HttpSiteApi::new(config_for(&server)).unwrap();
    let result = api.write(write_request(RecordType::Dpr, json!({}))).await;

    assert_matches!(result, Err(ApiError::Transient(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_transient() {
    let sync = SyncConfig::builder()
        .server_url("http://127.0.0.1:9")
        .request_timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let api = HttpSiteApi::new(Config::from_sync_config(sync)).unwrap();

    let result = api.write(write_request(RecordType::Dpr, json!({}))).await;
    assert_matches!(result, Err(ApiError::Transient(_)));
    assert!(!api.ping().await);
}

#[tokio::test]
async fn test_malformed_server_url_is_not_transient() {
    // Bypasses the builder, which refuses this URL
    let sync = SyncConfig {
        server_url: "http://exa mple.com".to_string(),
        ..SyncConfig::default()
    };
    assert!(sync.validate().is_err());
    let api = HttpSiteApi::new(Config::from_sync_config(sync)).unwrap();

    let result = api.write(write_request(RecordType::Dpr, json!({}))).await;
    assert_matches!(result, Err(ApiError::InvalidRequest(_)));

    let result = api.fetch("/api/ai/risk/P1").await;
    assert_matches!(result, Err(ApiError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_fetch_and_ping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ai/risk/P1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"level": "high"})))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let api = HttpSiteApi::new(config_for(&server)).unwrap();

    assert_eq!(api.fetch("/api/ai/risk/P1").await.unwrap(), json!({"level": "high"}));
    assert!(api.ping().await);
}

#[tokio::test]
async fn test_outage_then_recovery_through_engine() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&server);
    let store = Arc::new(LocalDatabase::open(dir.path().join("local.db")).await.unwrap());
    let api = Arc::new(HttpSiteApi::new(config.clone()).unwrap());
    let connectivity = ConnectivityMonitor::new(true, Duration::ZERO);
    let engine = OfflineEngine::with_parts(config.sync(), store, api, connectivity)
        .await
        .unwrap();

    // Device reports a link, server is down
    let outage = Mock::given(method("POST"))
        .and(path("/api/attendance/check-out"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let result = engine
        .gateway()
        .submit_payload(&AttendancePayload::check_out("P1", 12.9, 77.6))
        .await
        .unwrap();
    let SubmitResult::Queued { id } = result else {
        panic!("expected queued, got {:?}", result);
    };
    drop(outage);

    Mock::given(method("POST"))
        .and(path("/api/attendance/check-out"))
        .and(header(IDEMPOTENCY_HEADER, id.to_string().as_str()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&server)
        .await;

    let report = engine.reconciler().drain().await.unwrap();

    assert_eq!(report.synced, 1);
    assert!(engine.queue().is_empty().await);
}
