//! Field write scenarios end to end: gateway, queue, reconciler, store

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use sitesync::client::api_client::ApiError;
use sitesync::client::offline::SubmitResult;
use sitesync::shared::{
    AttendancePayload, FailureKind, MaterialRequestPayload, RecordStatus, RecordType, SyncError,
};

use crate::common::{Device, Reply};

#[tokio::test]
async fn test_attendance_check_in_while_offline() {
    let device = Device::new(false).await;
    let gateway = device.engine.gateway();
    let queue = device.engine.queue();

    let result = gateway
        .submit_payload(&AttendancePayload::check_in("P1", 12.9, 77.6))
        .await
        .unwrap();

    assert_matches!(result, SubmitResult::Queued { .. });
    assert_eq!(device.api.call_count(), 0);

    let records = queue.list().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_type, RecordType::Attendance);
    assert_eq!(records[0].status, RecordStatus::Pending);
    assert_eq!(records[0].payload["projectId"], "P1");
    assert_eq!(records[0].payload["latitude"], 12.9);
    assert_eq!(records[0].payload["longitude"], 77.6);

    device.go_online();
    let report = device.engine.reconciler().drain().await.unwrap();

    assert_eq!(report.synced, 1);
    assert!(queue.list().await.is_empty());
    assert_eq!(device.api.applied().len(), 1);
}

#[tokio::test]
async fn test_validation_rejection_is_never_queued() {
    let device = Device::new(true).await;
    device.api.script([Reply::Fail(ApiError::Rejected {
        status: 422,
        message: "quantity must be positive".to_string(),
    })]);

    let result = device
        .engine
        .gateway()
        .submit_payload(&MaterialRequestPayload::new("P1", "cement", -5.0, "bags"))
        .await;

    assert_matches!(
        result,
        Err(SyncError::Validation { status: 422, ref message }) if message == "quantity must be positive"
    );
    assert!(device.engine.queue().list().await.is_empty());
}

#[tokio::test]
async fn test_partial_drain_failure_keeps_only_failed_record() {
    let device = Device::new(false).await;
    let gateway = device.engine.gateway();
    gateway
        .submit_payload(&AttendancePayload::check_in("P1", 12.9, 77.6))
        .await
        .unwrap();
    let second = match gateway
        .submit_payload(&AttendancePayload::check_out("P1", 12.9, 77.6))
        .await
        .unwrap()
    {
        SubmitResult::Queued { id } => id,
        other => panic!("expected queued, got {:?}", other),
    };

    device.api.script([
        Reply::Accept,
        Reply::Fail(ApiError::Transient("500 Internal Server Error".to_string())),
    ]);
    device.go_online();
    let report = device.engine.reconciler().drain().await.unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 1);
    let records = device.engine.queue().list().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, second);
    assert_eq!(records[0].status, RecordStatus::Failed);
    assert_eq!(records[0].attempts, 1);
    assert_eq!(records[0].failure_kind, Some(FailureKind::Transient));
    assert!(records[0].last_error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_lost_response_is_applied_exactly_once() {
    let device = Device::new(true).await;
    device.api.script([Reply::ApplyButLoseResponse]);

    let result = device
        .engine
        .gateway()
        .submit(RecordType::Dpr, json!({"projectId": "P1", "manpower": 12}))
        .await
        .unwrap();
    let SubmitResult::Queued { id } = result else {
        panic!("expected queued, got {:?}", result);
    };
    assert_eq!(device.api.applied().len(), 1);

    let report = device.engine.reconciler().drain().await.unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(device.api.call_keys(), vec![id, id]);
    assert_eq!(device.api.applied().len(), 1);
    assert!(device.engine.queue().is_empty().await);
}

#[tokio::test]
async fn test_replay_follows_creation_order_per_type() {
    let device = Device::new(false).await;
    let gateway = device.engine.gateway();

    let mut attendance = Vec::new();
    let mut requests = Vec::new();
    for n in 0..4 {
        let SubmitResult::Queued { id } = gateway
            .submit(RecordType::Attendance, json!({"n": n}))
            .await
            .unwrap()
        else {
            panic!("expected queued");
        };
        attendance.push(id);

        let SubmitResult::Queued { id } = gateway
            .submit(RecordType::MaterialRequest, json!({"n": n}))
            .await
            .unwrap()
        else {
            panic!("expected queued");
        };
        requests.push(id);
    }

    device.go_online();
    device.engine.reconciler().drain().await.unwrap();

    let keys = device.api.call_keys();
    let replayed_attendance: Vec<_> = keys.iter().copied().filter(|k| attendance.contains(k)).collect();
    let replayed_requests: Vec<_> = keys.iter().copied().filter(|k| requests.contains(k)).collect();
    assert_eq!(replayed_attendance, attendance);
    assert_eq!(replayed_requests, requests);
}

#[tokio::test]
async fn test_failed_records_stay_visible_until_discarded() {
    let device = Device::new(false).await;
    let queue = device.engine.queue();
    let id = queue.enqueue(RecordType::Approval, json!({"requestId": "R7"})).await.unwrap();

    device.api.script([Reply::Fail(ApiError::Rejected {
        status: 410,
        message: "request already closed".to_string(),
    })]);
    device.go_online();
    device.engine.reconciler().drain().await.unwrap();

    for _ in 0..3 {
        device.engine.reconciler().drain().await.unwrap();
        let record = queue.get(id).await.expect("failed record must stay queued");
        assert_eq!(record.status, RecordStatus::Failed);
        assert!(record.last_error.is_some());
        assert!(record.is_rejected());
    }
    assert_eq!(device.api.call_count(), 1);

    assert!(queue.discard(id).await.unwrap());
    assert!(queue.list().await.is_empty());
}

#[tokio::test]
async fn test_manual_retry_after_rejection() {
    let device = Device::new(false).await;
    let queue = device.engine.queue();
    let id = queue.enqueue(RecordType::Dpr, json!({})).await.unwrap();

    device.api.script([Reply::Fail(ApiError::Rejected {
        status: 400,
        message: "reportDate missing".to_string(),
    })]);
    device.go_online();
    device.engine.reconciler().drain().await.unwrap();
    assert!(queue.get(id).await.unwrap().is_rejected());

    queue.retry(id).await.unwrap();
    let report = device.engine.reconciler().drain().await.unwrap();

    assert_eq!(report.synced, 1);
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_losing_connectivity_stops_new_calls() {
    let device = Device::new(false).await;
    let queue = device.engine.queue();
    for n in 0..3 {
        queue.enqueue(RecordType::Attendance, json!({"n": n})).await.unwrap();
    }

    device.go_online();
    device.api.go_offline_after(1, device.engine.connectivity().clone());
    let report = device.engine.reconciler().drain().await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.synced, 1);
    assert_eq!(device.api.call_count(), 1);

    let records = queue.list().await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status == RecordStatus::Pending && r.attempts == 0));
}

#[tokio::test]
async fn test_storage_failure_is_surfaced_to_caller() {
    let device = Device::new(false).await;
    device.engine.store().close().await;

    let result = device.engine.gateway().submit(RecordType::Dpr, json!({})).await;

    assert_matches!(result, Err(SyncError::Storage { .. }));
    assert!(device.engine.queue().is_empty().await);
}
