//! Shared Error Types
//!
//! Error taxonomy of the offline write path.
//!
//! # Error Categories
//!
//! - `TransientNetwork` - timeouts, refused connections, 5xx. Absorbed by the
//!   queue: the caller sees "queued", never this error.
//! - `Validation` - the server rejected the write (4xx). Never queued.
//! - `Storage` - the local store is unavailable. The durability guarantee
//!   cannot be honored, so it always reaches the user.
//! - `Request` - the request could not be built at all (malformed server
//!   URL, unencodable payload). Replaying cannot help, so it is never queued.
//! - `Serialization`, `InvalidTransition`, `NotFound` - programming or data
//!   errors around the queue itself.
//!
//! A server answer saying the idempotency key was already applied is not an
//! error at all; it is treated as a confirmed write.
//!
//! # Usage
//!
//! ```rust
//! use sitesync::shared::error::SyncError;
//!
//! let error = SyncError::validation(422, "quantity must be positive");
//! assert!(error.is_surfaced());
//! ```
use thiserror::Error;
use uuid::Uuid;

use crate::shared::record::RecordStatus;

/// Errors produced by the offline write path
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// Network-classified failure; recoverable by replay
    #[error("Network unavailable: {message}")]
    TransientNetwork {
        /// Human-readable error message
        message: String,
    },

    /// Definitive rejection by the server
    #[error("Rejected by server ({status}): {message}")]
    Validation {
        /// HTTP status the server answered with
        status: u16,
        /// Server-provided reason
        message: String,
    },

    /// Request could not be built; nothing was sent
    #[error("Invalid request: {message}")]
    Request {
        /// Human-readable error message
        message: String,
    },

    /// Local store could not be opened, read or written
    #[error("Local storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// JSON encoding or decoding failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// A status change that would move a record backwards
    #[error("Record {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: RecordStatus,
        to: RecordStatus,
    },

    /// No pending record with this id
    #[error("Record {id} not found")]
    NotFound { id: Uuid },
}

impl SyncError {
    /// Create a new transient network error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(status: u16, message: impl Into<String>) -> Self {
        Self::Validation {
            status,
            message: message.into(),
        }
    }

    /// Create a new request error
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Recoverable by queuing and replaying later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }

    /// Must be shown to the user rather than absorbed by the queue
    pub fn is_surfaced(&self) -> bool {
        !self.is_transient()
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}
