//! Queue durability across simulated process restarts

use pretty_assertions::assert_eq;
use serde_json::json;
use sitesync::client::local_db::Collection;
use sitesync::shared::{DprPayload, RecordStatus, RecordType, SyncError};

use crate::common::Device;

#[tokio::test]
async fn test_restart_rebuilds_identical_queue() {
    let device = Device::new(false).await;
    let gateway = device.engine.gateway();
    gateway.submit(RecordType::Attendance, json!({"projectId": "P1"})).await.unwrap();
    gateway.submit(RecordType::MaterialRequest, json!({"material": "rebar"})).await.unwrap();
    gateway
        .submit_payload(&DprPayload {
            project_id: "P1".to_string(),
            report_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            work_done: "Slab casting, level 3".to_string(),
            manpower: 24,
            issues: vec!["pump breakdown".to_string()],
        })
        .await
        .unwrap();
    let failing = device.engine.queue().enqueue(RecordType::Approval, json!({})).await.unwrap();
    device.engine.queue().mark_syncing(failing).await.unwrap();
    device
        .engine
        .queue()
        .mark_failed(failing, &SyncError::transient("connection refused"))
        .await
        .unwrap();

    let before = device.engine.queue().list().await;
    let device = device.restart(false).await;
    let after = device.engine.queue().list().await;

    assert_eq!(after, before);
    assert_eq!(after.len(), 4);
}

#[tokio::test]
async fn test_interrupted_syncing_is_replayed_after_restart() {
    let device = Device::new(false).await;
    let id = device.engine.queue().enqueue(RecordType::Dpr, json!({})).await.unwrap();
    device.engine.queue().mark_syncing(id).await.unwrap();

    let device = device.restart(true).await;
    let record = device.engine.queue().get(id).await.unwrap();
    assert_eq!(record.status, RecordStatus::Syncing);

    let report = device.engine.reconciler().drain().await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(device.api.call_keys(), vec![id]);
    assert!(device.engine.queue().is_empty().await);
}

#[tokio::test]
async fn test_synced_records_do_not_come_back() {
    let device = Device::new(false).await;
    device.engine.queue().enqueue(RecordType::Attendance, json!({})).await.unwrap();
    device.go_online();
    device.engine.reconciler().drain().await.unwrap();

    let device = device.restart(false).await;

    assert!(device.engine.queue().is_empty().await);
    let stored = device.engine.store().count(Collection::Attendance).await.unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_cached_reads_survive_restart() {
    let device = Device::new(true).await;
    let fresh = device
        .engine
        .cache()
        .fetch(&*device.api, "risk", "P1", "/api/ai/risk/P1")
        .await
        .unwrap();
    assert!(!fresh.stale);

    let device = device.restart(false).await;
    let cached = device
        .engine
        .cache()
        .fetch(&*device.api, "risk", "P1", "/api/ai/risk/P1")
        .await
        .unwrap();

    assert!(cached.stale);
    assert_eq!(cached.payload, fresh.payload);
    assert_eq!(cached.fetched_at, fresh.fetched_at);
}
