//! # Background Sync Service
//!
//! Decides when the reconciler drains. Two triggers:
//!
//! - **Reconnect**: the debounced connectivity signal turning online drains
//!   at once.
//! - **Fallback timer**: every `drain_interval`, while online, if no drain ran
//!   within the interval. Covers a server that came back while the device's
//!   link never dropped, and failed records whose backoff elapsed.
//!
//! The loop is a single task. Drains never overlap; the reconciler skips a
//! drain requested while another is running.
//!
//! ## Key Components
//!
//! - `network_monitor.rs`: debounced `ConnectivityMonitor`
//! - `scheduler.rs`: fallback-timer bookkeeping
//! - `metrics.rs`: drain counters
//! - `sync_state.rs`: `SyncStatus` snapshot
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sitesync::client::offline::OfflineEngine;
//! use sitesync::client::sync::SyncService;
//!
//! # async fn example(engine: OfflineEngine) -> Result<(), sitesync::shared::SyncError> {
//! let service = SyncService::new(&engine, std::time::Duration::from_secs(60));
//! service.start().await;
//!
//! engine.connectivity().report(true);
//!
//! let status = service.status().await;
//! println!("{} items pending sync", status.unsynced());
//!
//! service.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod metrics;
pub mod network_monitor;
pub mod scheduler;
pub mod sync_state;

pub use metrics::DrainMetrics;
pub use network_monitor::ConnectivityMonitor;
pub use scheduler::DrainScheduler;
pub use sync_state::SyncStatus;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::client::offline::queue::{PendingWriteQueue, QueueStats};
use crate::client::offline::reconciliation::{DrainReport, DrainState, Reconciler};
use crate::client::offline::OfflineEngine;
use crate::shared::error::SyncError;

/// Background drain loop around a `Reconciler`
#[derive(Debug)]
pub struct SyncService {
    reconciler: Arc<Reconciler>,
    queue: Arc<PendingWriteQueue>,
    connectivity: ConnectivityMonitor,
    scheduler: Arc<DrainScheduler>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncService {
    pub fn new(engine: &OfflineEngine, drain_interval: Duration) -> Self {
        Self::from_parts(
            engine.reconciler().clone(),
            engine.queue().clone(),
            engine.connectivity().clone(),
            drain_interval,
        )
    }

    pub fn from_parts(
        reconciler: Arc<Reconciler>,
        queue: Arc<PendingWriteQueue>,
        connectivity: ConnectivityMonitor,
        drain_interval: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            reconciler,
            queue,
            connectivity,
            scheduler: Arc::new(DrainScheduler::new(drain_interval)),
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Spawn the loop; no-op if it is already running
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("sync service already running");
            return;
        }

        self.shutdown.send_replace(false);
        let worker = SyncWorker {
            reconciler: self.reconciler.clone(),
            connectivity: self.connectivity.clone(),
            scheduler: self.scheduler.clone(),
        };
        let shutdown = self.shutdown.subscribe();
        let online = self.connectivity.subscribe();
        *task = Some(tokio::spawn(worker.run(shutdown, online)));

        info!(interval = ?self.scheduler.interval(), "sync service started");
    }

    /// Signal shutdown and wait for the loop; an in-flight drain finishes first
    pub async fn stop(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            self.shutdown.send_replace(true);
            if let Err(e) = handle.await {
                error!(error = %e, "sync loop ended abnormally");
            }
            info!("sync service stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Drain now, whatever the timer says
    pub async fn force_sync(&self) -> Result<DrainReport, SyncError> {
        let report = self.reconciler.drain().await;
        if matches!(&report, Ok(r) if !r.skipped) {
            self.scheduler.record_drain().await;
        }
        report
    }

    pub async fn status(&self) -> SyncStatus {
        let records = self.queue.list().await;
        let stats = QueueStats::from_records(&records);
        let last = self.reconciler.last_report().await;

        let mut status = SyncStatus {
            online: self.connectivity.is_online(),
            is_draining: self.reconciler.state() == DrainState::Draining,
            last_drain_at: last.as_ref().map(|(at, _)| *at),
            last_report: last.map(|(_, report)| report),
            ..SyncStatus::default()
        };
        status.apply_queue(&stats, &records);
        status
    }

    pub async fn metrics(&self) -> DrainMetrics {
        self.reconciler.metrics().await
    }

    pub async fn time_until_next_drain(&self) -> Duration {
        self.scheduler.time_until_next_drain().await
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

struct SyncWorker {
    reconciler: Arc<Reconciler>,
    connectivity: ConnectivityMonitor,
    scheduler: Arc<DrainScheduler>,
}

impl SyncWorker {
    async fn run(self, mut shutdown: watch::Receiver<bool>, mut online: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.scheduler.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        break;
                    }
                }
                changed = online.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let is_online = *online.borrow_and_update();
                    if is_online {
                        self.drain("reconnect").await;
                    }
                }
                _ = ticker.tick() => {
                    if self.connectivity.is_online() && self.scheduler.should_drain().await {
                        self.drain("timer").await;
                    }
                }
            }
        }
    }

    async fn drain(&self, trigger: &'static str) {
        debug!(trigger, "drain triggered");
        match self.reconciler.drain().await {
            Ok(report) if report.skipped => {}
            Ok(_) => self.scheduler.record_drain().await,
            Err(e) => {
                error!(trigger, error = %e, "drain failed");
                self.scheduler.record_drain().await;
            }
        }
    }
}
