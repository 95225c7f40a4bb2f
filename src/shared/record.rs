//! Pending Record Data Structure
//!
//! A `PendingRecord` is one write that the device has accepted from the user
//! but the server has not yet confirmed. It is the only unit of work the
//! offline queue deals in.
//!
//! # Lifecycle
//!
//! ```text
//! pending ──► syncing ──► synced (deleted)
//!    ▲           │
//!    └─ failed ◄─┘
//! ```
//!
//! `syncing` may be re-entered from `syncing`: a record left in that state by
//! an interrupted drain is replayed by the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::shared::error::SyncError;

/// Kind of field write, which decides the server endpoint and payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordType {
    /// Attendance check-in or check-out
    Attendance,
    /// Material request raised from site
    MaterialRequest,
    /// Daily progress report
    Dpr,
    /// Approval decision on a pending request
    Approval,
}

impl RecordType {
    /// Every record type, in a stable order
    pub const ALL: [RecordType; 4] = [
        RecordType::Attendance,
        RecordType::MaterialRequest,
        RecordType::Dpr,
        RecordType::Approval,
    ];

    /// Name used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Attendance => "attendance",
            RecordType::MaterialRequest => "material-request",
            RecordType::Dpr => "dpr",
            RecordType::Approval => "approval",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SyncError::serialization(format!("unknown record type '{}'", s)))
    }
}

/// Replay status of a pending record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Waiting for the next drain
    Pending,
    /// A replay was issued and no answer has been recorded yet
    Syncing,
    /// Confirmed by the server; never stored
    Synced,
    /// Last replay failed; kept with its error until retried or discarded
    Failed,
}

impl RecordStatus {
    /// Whether a record may move from `self` to `next`
    pub fn can_transition_to(self, next: RecordStatus) -> bool {
        use RecordStatus::*;
        matches!(
            (self, next),
            (Pending, Syncing)
                | (Syncing, Syncing)
                | (Syncing, Synced)
                | (Syncing, Failed)
                | (Failed, Pending)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Syncing => "syncing",
            RecordStatus::Synced => "synced",
            RecordStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the last replay of a record failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Network-level failure; replaying later can succeed
    Transient,
    /// The server refused the payload; needs user correction
    Rejected,
}

/// One not-yet-confirmed write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRecord {
    /// Local id, also sent to the server as the idempotency key
    pub id: Uuid,
    /// Which server resource this write targets
    pub record_type: RecordType,
    /// Body of the write
    pub payload: serde_json::Value,
    /// Device-local creation time
    pub created_at: DateTime<Utc>,
    /// Current replay status
    pub status: RecordStatus,
    /// Number of failed replays
    pub attempts: u32,
    /// Error from the last failed replay
    pub last_error: Option<String>,
    /// Classification of `last_error`
    #[serde(default)]
    pub failure_kind: Option<FailureKind>,
    /// When the last replay was issued
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl PendingRecord {
    /// Create a fresh pending record with a new id
    pub fn new(record_type: RecordType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_type,
            payload,
            created_at: Utc::now(),
            status: RecordStatus::Pending,
            attempts: 0,
            last_error: None,
            failure_kind: None,
            last_attempt_at: None,
        }
    }

    /// How long this write has been waiting, for "delay" displays
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.created_at)
    }

    /// Failed and the server refused it outright
    pub fn is_rejected(&self) -> bool {
        self.status == RecordStatus::Failed && self.failure_kind == Some(FailureKind::Rejected)
    }

    /// Key under which the record is stored
    pub fn storage_key(&self) -> String {
        self.id.to_string()
    }
}

/// Stable sort by creation time; ties keep their existing order.
pub fn sort_for_replay(records: &mut [PendingRecord]) {
    records.sort_by_key(|r| r.created_at);
}
