//! # Pending Write Queue
//!
//! In-memory, observable mirror of every write the server has not confirmed,
//! backed by the local store.
//!
//! ## Rules
//!
//! - Every mutation is written to the local store before the in-memory state
//!   changes and before subscribers are notified. A reload rebuilds exactly
//!   the state the UI last saw.
//! - All status changes go through `transition`, which refuses to move a
//!   record backwards.
//! - Only the submission gateway enqueues and only the reconciler and
//!   explicit user actions change status. The UI reads and subscribes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sitesync::client::offline::PendingWriteQueue;
//! use sitesync::client::local_db::LocalDatabase;
//! use sitesync::shared::RecordType;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), sitesync::shared::SyncError> {
//! let db = Arc::new(LocalDatabase::open_default().await?);
//! let queue = PendingWriteQueue::open(db).await?;
//!
//! let mut changes = queue.subscribe();
//! let id = queue.enqueue(RecordType::Dpr, serde_json::json!({"projectId": "P1"})).await?;
//! changes.changed().await.ok();
//! println!("{} items pending sync", changes.borrow().len());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::error::SyncError;
use crate::shared::record::{sort_for_replay, FailureKind, PendingRecord, RecordStatus, RecordType};

/// Queue of not-yet-confirmed writes
#[derive(Debug)]
pub struct PendingWriteQueue {
    store: Arc<LocalDatabase>,
    /// Ordered by `created_at`; the write lock also serializes store writes
    records: RwLock<Vec<PendingRecord>>,
    changes: watch::Sender<Vec<PendingRecord>>,
}

impl PendingWriteQueue {
    /// Rebuild the queue from the local store
    pub async fn open(store: Arc<LocalDatabase>) -> Result<Self> {
        let mut records = Vec::new();
        for record_type in RecordType::ALL {
            let stored: Vec<PendingRecord> = store.list(record_type.into()).await?;
            records.extend(stored);
        }
        sort_for_replay(&mut records);

        info!(restored = records.len(), "pending write queue opened");

        let (changes, _) = watch::channel(records.clone());
        Ok(Self {
            store,
            records: RwLock::new(records),
            changes,
        })
    }

    /// Queue a new write; returns its id
    pub async fn enqueue(&self, record_type: RecordType, payload: Value) -> Result<Uuid> {
        self.enqueue_record(PendingRecord::new(record_type, payload)).await
    }

    /// Queue a record built by the caller (keeps its id)
    ///
    /// Enqueuing an id that is already queued is a no-op.
    pub async fn enqueue_record(&self, mut record: PendingRecord) -> Result<Uuid> {
        let mut records = self.records.write().await;

        if records.iter().any(|r| r.id == record.id) {
            debug!(id = %record.id, "record already queued");
            return Ok(record.id);
        }

        record.status = RecordStatus::Pending;
        self.store
            .put(record.record_type.into(), &record.storage_key(), &record)
            .await?;

        let id = record.id;
        info!(id = %id, record_type = %record.record_type, "write queued");
        records.push(record);
        sort_for_replay(&mut records);
        self.publish(&records);

        Ok(id)
    }

    /// pending → syncing (also re-enters syncing after an interrupted drain)
    pub async fn mark_syncing(&self, id: Uuid) -> Result<PendingRecord> {
        self.transition(id, RecordStatus::Syncing, |record| {
            record.last_attempt_at = Some(Utc::now());
        })
        .await
    }

    /// syncing → synced: the record is deleted
    pub async fn mark_synced(&self, id: Uuid) -> Result<()> {
        let mut records = self.records.write().await;
        let index = Self::position(&records, id)?;
        let current = records[index].status;
        if !current.can_transition_to(RecordStatus::Synced) {
            return Err(SyncError::InvalidTransition {
                id,
                from: current,
                to: RecordStatus::Synced,
            });
        }

        let record = &records[index];
        self.store
            .delete(record.record_type.into(), &record.storage_key())
            .await?;

        let record = records.remove(index);
        info!(id = %id, record_type = %record.record_type, attempts = record.attempts, "write synced");
        self.publish(&records);
        Ok(())
    }

    /// syncing → failed, counting the attempt and keeping the error
    pub async fn mark_failed(&self, id: Uuid, error: &SyncError) -> Result<PendingRecord> {
        let kind = match error {
            SyncError::Validation { .. } | SyncError::Request { .. } => FailureKind::Rejected,
            _ => FailureKind::Transient,
        };
        let message = error.to_string();

        let record = self
            .transition(id, RecordStatus::Failed, |record| {
                record.attempts += 1;
                record.last_error = Some(message);
                record.failure_kind = Some(kind);
            })
            .await?;

        warn!(
            id = %id,
            record_type = %record.record_type,
            attempts = record.attempts,
            error = %error,
            "write replay failed"
        );
        Ok(record)
    }

    /// failed → pending, on user request or automatic re-arm
    pub async fn retry(&self, id: Uuid) -> Result<PendingRecord> {
        self.transition(id, RecordStatus::Pending, |_| {}).await
    }

    /// Delete a record whatever its status
    pub async fn remove(&self, id: Uuid) -> Result<bool> {
        let mut records = self.records.write().await;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };

        let record = &records[index];
        self.store
            .delete(record.record_type.into(), &record.storage_key())
            .await?;
        records.remove(index);
        self.publish(&records);
        Ok(true)
    }

    /// User gave up on a write
    pub async fn discard(&self, id: Uuid) -> Result<bool> {
        let removed = self.remove(id).await?;
        if removed {
            info!(id = %id, "write discarded by user");
        }
        Ok(removed)
    }

    /// Snapshot ordered by `created_at`
    pub async fn list(&self) -> Vec<PendingRecord> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<PendingRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Receiver of the full record list after every change
    pub fn subscribe(&self) -> watch::Receiver<Vec<PendingRecord>> {
        self.changes.subscribe()
    }

    /// Call `listener` with the current list, then after every change
    pub fn on_queue_change<F>(&self, mut listener: F) -> JoinHandle<()>
    where
        F: FnMut(&[PendingRecord]) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            listener(&rx.borrow_and_update());
            while rx.changed().await.is_ok() {
                listener(&rx.borrow_and_update());
            }
        })
    }

    /// Counts per status
    pub async fn stats(&self) -> QueueStats {
        QueueStats::from_records(&self.records.read().await)
    }

    /// "N items pending sync" line for offline indicators
    pub async fn summary(&self) -> QueueSummary {
        let stats = self.stats().await;
        QueueSummary {
            unsynced: stats.total,
            failed: stats.failed,
            oldest_created_at: stats.oldest_created_at,
        }
    }

    async fn transition<F>(&self, id: Uuid, to: RecordStatus, mutate: F) -> Result<PendingRecord>
    where
        F: FnOnce(&mut PendingRecord),
    {
        let mut records = self.records.write().await;
        let index = Self::position(&records, id)?;
        let from = records[index].status;
        if !from.can_transition_to(to) {
            return Err(SyncError::InvalidTransition { id, from, to });
        }

        let mut updated = records[index].clone();
        updated.status = to;
        mutate(&mut updated);

        self.store
            .put(updated.record_type.into(), &updated.storage_key(), &updated)
            .await?;

        debug!(id = %id, from = %from, to = %to, "record status changed");
        records[index] = updated.clone();
        self.publish(&records);
        Ok(updated)
    }

    fn position(records: &[PendingRecord], id: Uuid) -> Result<usize> {
        records
            .iter()
            .position(|r| r.id == id)
            .ok_or(SyncError::NotFound { id })
    }

    fn publish(&self, records: &[PendingRecord]) {
        self.changes.send_replace(records.to_vec());
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub syncing: usize,
    pub failed: usize,
    /// Failed records the server refused; need user correction
    pub rejected: usize,
    /// Creation time of the oldest unsynced write
    pub oldest_created_at: Option<DateTime<Utc>>,
}

impl QueueStats {
    pub fn from_records(records: &[PendingRecord]) -> Self {
        let mut stats = QueueStats {
            total: records.len(),
            oldest_created_at: records.iter().map(|r| r.created_at).min(),
            ..Default::default()
        };
        for record in records {
            match record.status {
                RecordStatus::Pending => stats.pending += 1,
                RecordStatus::Syncing => stats.syncing += 1,
                RecordStatus::Failed => {
                    stats.failed += 1;
                    if record.is_rejected() {
                        stats.rejected += 1;
                    }
                }
                RecordStatus::Synced => {}
            }
        }
        stats
    }
}

/// Condensed view of the queue
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    pub unsynced: usize,
    pub failed: usize,
    pub oldest_created_at: Option<DateTime<Utc>>,
}
