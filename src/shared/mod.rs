//! Shared Module
//!
//! Platform-agnostic types used by every part of the engine: the pending
//! record and its status machine, typed write payloads, cached read results,
//! the error taxonomy and the configuration types.

/// Pending record and status machine
pub mod record;

/// Typed write payloads
pub mod payload;

/// Cached read results
pub mod cache;

/// Shared error types
pub mod error;

/// Engine configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use record::{FailureKind, PendingRecord, RecordStatus, RecordType};
pub use payload::{
    ApprovalDecision, ApprovalPayload, AttendanceAction, AttendancePayload, DprPayload,
    MaterialRequestPayload, WritePayload,
};
pub use cache::{CachedRead, CachedResult};
pub use error::SyncError;
pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
