//! # Reconciler
//!
//! Replays the pending write queue against the server. One drain cycle goes
//! Idle → Draining → Idle:
//!
//! 1. Re-arm failed records whose retry backoff elapsed.
//! 2. Snapshot the queue and keep `pending` and `syncing` records. A record
//!    found `syncing` was interrupted; its outcome is unknown and it is
//!    replayed under the same idempotency key.
//! 3. Replay in `created_at` order. Each record goes `syncing`, then `synced`
//!    (deleted) or `failed` with the error attached. A failure never aborts
//!    the remaining records.
//! 4. Before each new call, check connectivity. Losing it stops the drain
//!    after the in-flight call resolves; untouched records stay `pending`.
//!
//! A storage error aborts the drain and is returned: continuing would replay
//! writes whose outcome can no longer be recorded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::api_client::{ServerAck, SiteApi, WriteRequest};
use crate::client::offline::queue::PendingWriteQueue;
use crate::client::offline::retry::RetryPolicy;
use crate::client::sync::metrics::DrainMetrics;
use crate::client::sync::network_monitor::ConnectivityMonitor;
use crate::shared::error::SyncError;
use crate::shared::record::{PendingRecord, RecordStatus};

/// Reconciler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainState {
    Idle,
    Draining,
}

/// What one drain cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// Failed records moved back to pending before replay
    pub rearmed: usize,
    /// Network calls issued
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    /// Records left in the queue afterwards
    pub remaining: usize,
    /// Stopped early because connectivity was lost
    pub cancelled: bool,
    /// Not run: another drain was in progress
    pub skipped: bool,
}

pub struct Reconciler {
    queue: Arc<PendingWriteQueue>,
    api: Arc<dyn SiteApi>,
    connectivity: ConnectivityMonitor,
    retry_policy: RetryPolicy,
    request_timeout: Duration,
    /// Held for the whole drain; drains never overlap
    drain_lock: Mutex<()>,
    metrics: RwLock<DrainMetrics>,
    last_report: RwLock<Option<(DateTime<Utc>, DrainReport)>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("state", &self.state())
            .field("retry_policy", &self.retry_policy)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Reconciler {
    pub fn new(
        queue: Arc<PendingWriteQueue>,
        api: Arc<dyn SiteApi>,
        connectivity: ConnectivityMonitor,
        retry_policy: RetryPolicy,
        request_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            api,
            connectivity,
            retry_policy,
            request_timeout,
            drain_lock: Mutex::new(()),
            metrics: RwLock::new(DrainMetrics::new()),
            last_report: RwLock::new(None),
        }
    }

    pub fn state(&self) -> DrainState {
        match self.drain_lock.try_lock() {
            Ok(_) => DrainState::Idle,
            Err(_) => DrainState::Draining,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub async fn metrics(&self) -> DrainMetrics {
        self.metrics.read().await.clone()
    }

    /// Finish time and report of the last drain that ran
    pub async fn last_report(&self) -> Option<(DateTime<Utc>, DrainReport)> {
        self.last_report.read().await.clone()
    }

    /// Run one drain cycle
    pub async fn drain(&self) -> Result<DrainReport, SyncError> {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            debug!("drain already in progress, skipping");
            return Ok(DrainReport {
                skipped: true,
                ..DrainReport::default()
            });
        };

        let mut report = DrainReport::default();
        if !self.connectivity.is_online() {
            debug!("offline, drain not started");
            report.cancelled = true;
            report.remaining = self.queue.len().await;
            return Ok(report);
        }

        let started = Instant::now();
        let queued = self.queue.len().await;
        info!(queued, "drain started");

        let outcome = self.replay_all(&mut report).await;
        report.remaining = self.queue.len().await;

        let elapsed = started.elapsed();
        self.metrics
            .write()
            .await
            .record_drain(elapsed, report.synced, report.failed, report.cancelled);
        *self.last_report.write().await = Some((Utc::now(), report.clone()));

        match outcome {
            Ok(()) => {
                info!(
                    attempted = report.attempted,
                    synced = report.synced,
                    failed = report.failed,
                    remaining = report.remaining,
                    cancelled = report.cancelled,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "drain finished"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, synced = report.synced, "drain aborted");
                Err(e)
            }
        }
    }

    async fn replay_all(&self, report: &mut DrainReport) -> Result<(), SyncError> {
        report.rearmed = self.rearm_due().await?;

        let snapshot: Vec<PendingRecord> = self
            .queue
            .list()
            .await
            .into_iter()
            .filter(|r| matches!(r.status, RecordStatus::Pending | RecordStatus::Syncing))
            .collect();

        for record in snapshot {
            if !self.connectivity.is_online() {
                info!(id = %record.id, "connectivity lost, stopping drain");
                report.cancelled = true;
                break;
            }

            let record = match self.queue.mark_syncing(record.id).await {
                Ok(record) => record,
                // Discarded or retried by the user since the snapshot
                Err(SyncError::NotFound { .. } | SyncError::InvalidTransition { .. }) => continue,
                Err(e) => return Err(e),
            };
            report.attempted += 1;

            match self.replay(&record).await {
                Ok(ack) => {
                    debug!(id = %record.id, replayed = ack.replayed, "replay confirmed");
                    match self.queue.mark_synced(record.id).await {
                        Ok(()) | Err(SyncError::NotFound { .. }) => report.synced += 1,
                        Err(e) => return Err(e),
                    }
                }
                Err(error) => match self.queue.mark_failed(record.id, &error).await {
                    Ok(_) => report.failed += 1,
                    Err(SyncError::NotFound { .. }) => {}
                    Err(e) => return Err(e),
                },
            }
        }

        Ok(())
    }

    async fn replay(&self, record: &PendingRecord) -> Result<ServerAck, SyncError> {
        let request = WriteRequest::from(record);
        match tokio::time::timeout(self.request_timeout, self.api.write(request)).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => Err(SyncError::transient(format!(
                "no answer within {:?}",
                self.request_timeout
            ))),
        }
    }

    /// Move failed records whose backoff elapsed back to pending
    async fn rearm_due(&self) -> Result<usize, SyncError> {
        let now = Utc::now();
        let due: Vec<_> = self
            .queue
            .list()
            .await
            .iter()
            .filter(|r| self.retry_policy.should_rearm(r, now))
            .map(|r| r.id)
            .collect();

        let mut rearmed = 0;
        for id in due {
            match self.queue.retry(id).await {
                Ok(_) => rearmed += 1,
                Err(SyncError::NotFound { .. } | SyncError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if rearmed > 0 {
            debug!(rearmed, "failed records re-armed");
        }
        Ok(rearmed)
    }
}
