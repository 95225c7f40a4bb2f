//! # Sync State
//!
//! Point-in-time snapshot for offline indicators and the pending-sync badge.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::offline::reconciliation::DrainReport;
use crate::client::offline::queue::QueueStats;
use crate::shared::record::PendingRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub online: bool,
    pub is_draining: bool,
    pub last_drain_at: Option<DateTime<Utc>>,
    pub last_report: Option<DrainReport>,
    pub pending: usize,
    pub syncing: usize,
    pub failed: usize,
    /// Failed records that need user correction
    pub rejected: usize,
    pub oldest_pending_at: Option<DateTime<Utc>>,
    /// Error of the most recently failed record
    pub last_error: Option<String>,
}

impl SyncStatus {
    /// Writes the server has not confirmed yet
    pub fn unsynced(&self) -> usize {
        self.pending + self.syncing + self.failed
    }

    pub(crate) fn apply_queue(&mut self, stats: &QueueStats, records: &[PendingRecord]) {
        self.pending = stats.pending;
        self.syncing = stats.syncing;
        self.failed = stats.failed;
        self.rejected = stats.rejected;
        self.oldest_pending_at = stats.oldest_created_at;
        self.last_error = records
            .iter()
            .filter(|r| r.last_error.is_some())
            .max_by_key(|r| r.last_attempt_at)
            .and_then(|r| r.last_error.clone());
    }
}
