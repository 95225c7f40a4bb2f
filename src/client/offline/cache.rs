//! # Result Cache
//!
//! Read-path fallback for read-mostly endpoints such as AI risk assessments.
//! Stored in the `ai-cache` collection of the local store. Never authoritative:
//! a successful online read overwrites the entry before it is returned, and a
//! cached answer is always handed out with `stale = true`.

use chrono::Utc;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::api_client::{ApiError, SiteApi};
use crate::client::local_db::{Collection, LocalDatabase};
use crate::client::sync::network_monitor::ConnectivityMonitor;
use crate::shared::cache::{CachedRead, CachedResult};
use crate::shared::error::SyncError;

#[derive(Debug, Clone)]
pub struct ResultCache {
    store: Arc<LocalDatabase>,
    connectivity: ConnectivityMonitor,
}

impl ResultCache {
    pub fn new(store: Arc<LocalDatabase>, connectivity: ConnectivityMonitor) -> Self {
        Self { store, connectivity }
    }

    /// Overwrite the entry for `scope`/`key`
    pub async fn save(&self, scope: &str, key: &str, payload: Value) -> Result<CachedResult, SyncError> {
        let entry = CachedResult {
            scope: scope.to_string(),
            key: key.to_string(),
            payload,
            fetched_at: Utc::now(),
        };
        self.store
            .put(Collection::AiCache, &CachedResult::storage_key(scope, key), &entry)
            .await?;
        Ok(entry)
    }

    pub async fn get(&self, scope: &str, key: &str) -> Result<Option<CachedResult>, SyncError> {
        self.store
            .get(Collection::AiCache, &CachedResult::storage_key(scope, key))
            .await
    }

    /// Fetch online and refresh the cache, falling back to the cached copy
    ///
    /// Offline, `fetch` is not called. With neither network nor cache the
    /// fetch error (or a transient "offline" error) is returned.
    pub async fn read_through<F, Fut>(&self, scope: &str, key: &str, fetch: F) -> Result<CachedRead, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ApiError>>,
    {
        let failure = if self.connectivity.is_online() {
            match fetch().await {
                Ok(payload) => {
                    let entry = self.save(scope, key, payload).await?;
                    return Ok(CachedRead {
                        payload: entry.payload,
                        fetched_at: entry.fetched_at,
                        stale: false,
                    });
                }
                Err(e) => {
                    warn!(scope, key, error = %e, "read failed, trying cache");
                    SyncError::from(e)
                }
            }
        } else {
            SyncError::transient("offline")
        };

        match self.get(scope, key).await? {
            Some(cached) => {
                debug!(scope, key, fetched_at = %cached.fetched_at, "serving cached result");
                Ok(cached.into())
            }
            None => Err(failure),
        }
    }

    /// `read_through` against a server path
    pub async fn fetch(&self, api: &dyn SiteApi, scope: &str, key: &str, path: &str) -> Result<CachedRead, SyncError> {
        self.read_through(scope, key, || api.fetch(path)).await
    }
}
