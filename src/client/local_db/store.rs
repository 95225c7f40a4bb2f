//! # Collection-scoped key/value operations
//!
//! `put`, `get`, `list` and `delete` over the logical collections of the
//! local store. Values are stored as JSON.

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::error::SyncError;
use crate::shared::record::RecordType;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Logical collection inside the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Attendance,
    MaterialRequest,
    Dpr,
    Approval,
    /// Non-authoritative read cache
    AiCache,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Attendance,
        Collection::MaterialRequest,
        Collection::Dpr,
        Collection::Approval,
        Collection::AiCache,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Attendance => "attendance",
            Collection::MaterialRequest => "material-request",
            Collection::Dpr => "dpr",
            Collection::Approval => "approval",
            Collection::AiCache => "ai-cache",
        }
    }
}

impl From<RecordType> for Collection {
    fn from(record_type: RecordType) -> Self {
        match record_type {
            RecordType::Attendance => Collection::Attendance,
            RecordType::MaterialRequest => Collection::MaterialRequest,
            RecordType::Dpr => Collection::Dpr,
            RecordType::Approval => Collection::Approval,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = SyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SyncError::storage(format!("unknown collection '{}'", s)))
    }
}

impl LocalDatabase {
    /// Insert or overwrite `id` in `collection`
    ///
    /// Durable once this returns `Ok`.
    pub async fn put<T: Serialize>(&self, collection: Collection, id: &str, value: &T) -> Result<()> {
        let body = serde_json::to_string(value)?;

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO store_entries (collection, id, body, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (collection, id)
             DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(&body)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Read one entry
    pub async fn get<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> Result<Option<T>> {
        let row = sqlx::query("SELECT body FROM store_entries WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => {
                let body: String = row.try_get("body")?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    /// All entries of a collection in insertion order
    pub async fn list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let rows = sqlx::query("SELECT id, body FROM store_entries WHERE collection = ? ORDER BY seq ASC")
            .bind(collection.as_str())
            .fetch_all(self.pool())
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let body: String = row.try_get("body")?;
            let value = serde_json::from_str(&body).map_err(|e| {
                SyncError::serialization(format!("corrupt entry {}/{}: {}", collection, id, e))
            })?;
            entries.push(value);
        }

        Ok(entries)
    }

    /// Remove an entry; returns whether it existed
    pub async fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let mut tx = self.pool().begin().await?;
        let result = sqlx::query("DELETE FROM store_entries WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of entries in a collection
    pub async fn count(&self, collection: Collection) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM store_entries WHERE collection = ?")
            .bind(collection.as_str())
            .fetch_one(self.pool())
            .await?;
        Ok(count as u64)
    }
}
