//! Cached read results
//!
//! Non-authoritative copies of read-mostly responses (AI risk assessments and
//! the like). Overwritten wholesale on every successful online fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last successful response for one scope/key pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResult {
    pub scope: String,
    pub key: String,
    pub payload: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

impl CachedResult {
    /// Storage key combining scope and key
    ///
    /// The scope is length-prefixed, so no choice of scope and key can
    /// produce another pair's key.
    pub fn storage_key(scope: &str, key: &str) -> String {
        format!("{}:{}:{}", scope.len(), scope, key)
    }
}

/// What a read-through call hands to the UI
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRead {
    pub payload: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    /// True when served from cache; the UI must flag it
    pub stale: bool,
}

impl From<CachedResult> for CachedRead {
    fn from(cached: CachedResult) -> Self {
        Self {
            payload: cached.payload,
            fetched_at: cached.fetched_at,
            stale: true,
        }
    }
}
