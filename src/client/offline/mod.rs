//! # Offline Write Engine
//!
//! Offline-first write path for field screens: every write is either
//! confirmed by the server or durably queued, and queued writes are replayed
//! exactly once when connectivity returns.
//!
//! ## Architecture
//!
//! - **Pending Write Queue**: observable mirror of unconfirmed writes
//! - **Submission Gateway**: online attempt or queue, per write
//! - **Reconciler**: replays the queue, one drain at a time
//! - **Retry Policy**: when failed records are replayed automatically
//! - **Result Cache**: stale-but-flagged fallback for read-mostly endpoints
//!
//! ## Key Components
//!
//! - `queue.rs`: `PendingWriteQueue`
//! - `gateway.rs`: `SubmissionGateway`
//! - `reconciliation.rs`: `Reconciler`
//! - `retry.rs`: `RetryPolicy` and backoff
//! - `cache.rs`: `ResultCache`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sitesync::client::offline::OfflineEngine;
//! use sitesync::client::api_client::HttpSiteApi;
//! use sitesync::client::config::Config;
//! use sitesync::shared::AttendancePayload;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let api = Arc::new(HttpSiteApi::new(config.clone())?);
//! let engine = OfflineEngine::open(config.sync(), api).await?;
//!
//! let result = engine
//!     .gateway()
//!     .submit_payload(&AttendancePayload::check_in("P1", 12.9, 77.6))
//!     .await?;
//! println!("{:?}", result);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod gateway;
pub mod queue;
pub mod reconciliation;
pub mod retry;

#[cfg(test)]
pub(crate) mod fake_api;

pub use cache::ResultCache;
pub use gateway::{SubmissionGateway, SubmitResult};
pub use queue::{PendingWriteQueue, QueueStats, QueueSummary};
pub use reconciliation::{DrainReport, DrainState, Reconciler};
pub use retry::{BackoffStrategy, RetryPolicy};

use std::sync::Arc;

use crate::client::api_client::SiteApi;
use crate::client::local_db::LocalDatabase;
use crate::client::sync::network_monitor::ConnectivityMonitor;
use crate::shared::config::SyncConfig;
use crate::shared::error::SyncError;

/// The wired-up offline engine
///
/// Cheap to share: every component is behind an `Arc`.
#[derive(Debug, Clone)]
pub struct OfflineEngine {
    store: Arc<LocalDatabase>,
    queue: Arc<PendingWriteQueue>,
    connectivity: ConnectivityMonitor,
    gateway: Arc<SubmissionGateway>,
    reconciler: Arc<Reconciler>,
    cache: ResultCache,
}

impl OfflineEngine {
    /// Open the local store under `config.data_dir` and wire every component
    ///
    /// Starts offline; the platform reports connectivity through
    /// `connectivity().report(..)`.
    pub async fn open(config: &SyncConfig, api: Arc<dyn SiteApi>) -> Result<Self, SyncError> {
        let store = LocalDatabase::open_in(config.data_dir.as_deref()).await?;
        let connectivity = ConnectivityMonitor::new(false, config.connectivity_debounce);
        Self::with_parts(config, Arc::new(store), api, connectivity).await
    }

    /// Wire the engine around an already-open store and monitor
    pub async fn with_parts(
        config: &SyncConfig,
        store: Arc<LocalDatabase>,
        api: Arc<dyn SiteApi>,
        connectivity: ConnectivityMonitor,
    ) -> Result<Self, SyncError> {
        let queue = Arc::new(PendingWriteQueue::open(store.clone()).await?);
        let gateway = Arc::new(SubmissionGateway::new(
            api.clone(),
            queue.clone(),
            connectivity.clone(),
            config.request_timeout,
        ));
        let reconciler = Arc::new(Reconciler::new(
            queue.clone(),
            api,
            connectivity.clone(),
            RetryPolicy::from_config(config),
            config.request_timeout,
        ));
        let cache = ResultCache::new(store.clone(), connectivity.clone());

        Ok(Self {
            store,
            queue,
            connectivity,
            gateway,
            reconciler,
            cache,
        })
    }

    pub fn store(&self) -> &Arc<LocalDatabase> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<PendingWriteQueue> {
        &self.queue
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn gateway(&self) -> &Arc<SubmissionGateway> {
        &self.gateway
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }
}
