//! Typed Write Payloads
//!
//! Bodies of the four field writes. Screens build one of these and hand it to
//! the submission gateway; the queue itself only sees `serde_json::Value`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::record::RecordType;

/// A payload that knows which server resource it targets
pub trait WritePayload: Serialize {
    /// Record type used for queuing and endpoint selection
    const RECORD_TYPE: RecordType;
}

/// Direction of an attendance mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceAction {
    CheckIn,
    CheckOut,
}

impl AttendanceAction {
    /// Path segment of the server endpoint
    pub fn endpoint_segment(&self) -> &'static str {
        match self {
            AttendanceAction::CheckIn => "check-in",
            AttendanceAction::CheckOut => "check-out",
        }
    }
}

/// Attendance check-in/check-out captured on site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePayload {
    pub project_id: String,
    pub action: AttendanceAction,
    pub latitude: f64,
    pub longitude: f64,
    /// Device time of the check-in/out
    pub recorded_at: DateTime<Utc>,
    /// Workers pre-selected by the face-matching capability, if it ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendee_ids: Vec<String>,
}

impl AttendancePayload {
    /// Check-in at the given position, stamped now
    pub fn check_in(project_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            project_id: project_id.into(),
            action: AttendanceAction::CheckIn,
            latitude,
            longitude,
            recorded_at: Utc::now(),
            attendee_ids: Vec::new(),
        }
    }

    /// Check-out at the given position, stamped now
    pub fn check_out(project_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            action: AttendanceAction::CheckOut,
            ..Self::check_in(project_id, latitude, longitude)
        }
    }
}

impl WritePayload for AttendancePayload {
    const RECORD_TYPE: RecordType = RecordType::Attendance;
}

/// Request for material delivery to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequestPayload {
    pub project_id: String,
    pub material: String,
    /// Not validated locally; the server owns validation
    pub quantity: f64,
    pub unit: String,
    pub needed_by: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl MaterialRequestPayload {
    pub fn new(
        project_id: impl Into<String>,
        material: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            material: material.into(),
            quantity,
            unit: unit.into(),
            needed_by: None,
            notes: None,
        }
    }
}

impl WritePayload for MaterialRequestPayload {
    const RECORD_TYPE: RecordType = RecordType::MaterialRequest;
}

/// Daily progress report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DprPayload {
    pub project_id: String,
    pub report_date: NaiveDate,
    pub work_done: String,
    pub manpower: u32,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl WritePayload for DprPayload {
    const RECORD_TYPE: RecordType = RecordType::Dpr;
}

/// Decision on an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPayload {
    pub request_id: String,
    pub decision: ApprovalDecision,
    pub comment: Option<String>,
}

impl WritePayload for ApprovalPayload {
    const RECORD_TYPE: RecordType = RecordType::Approval;
}
