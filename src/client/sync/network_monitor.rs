//! # Network Monitor
//!
//! Debounced online/offline signal for the sync engine.
//!
//! The platform feeds raw connectivity reports through `report`. Losing the
//! network is published at once, so the gateway stops attempting doomed round
//! trips. Regaining it is published only after the signal has held for the
//! debounce window: a flapping link produces one reconnect, not a storm of
//! drains.
//!
//! "Online" here is necessary but not sufficient. The submission gateway still
//! attempts the real call and queues on failure, because a device can report a
//! link while the server is unreachable.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::client::api_client::SiteApi;

/// Debounced connectivity signal; cheap to clone
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    raw: watch::Sender<bool>,
    published: watch::Sender<bool>,
    debounce: Duration,
}

impl Inner {
    fn publish(&self, online: bool) {
        let changed = self.published.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }
}

impl ConnectivityMonitor {
    /// Create a monitor; spawns the debounce task on the current runtime
    pub fn new(initially_online: bool, debounce: Duration) -> Self {
        let (raw, raw_rx) = watch::channel(initially_online);
        let (published, _) = watch::channel(initially_online);
        let inner = Arc::new(Inner {
            raw,
            published,
            debounce,
        });

        tokio::spawn(settle_online(Arc::downgrade(&inner), raw_rx, debounce));

        Self { inner }
    }

    /// Debounced state
    pub fn is_online(&self) -> bool {
        *self.inner.published.borrow()
    }

    /// Feed a raw platform signal
    pub fn report(&self, online: bool) {
        let changed = self.inner.raw.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if !changed {
            return;
        }

        debug!(online, "raw connectivity report");
        if !online || self.inner.debounce.is_zero() {
            self.inner.publish(online);
        }
    }

    /// Receiver of the debounced state
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.published.subscribe()
    }

    /// Run `callback` on every debounced change
    pub fn on_change<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(bool) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                callback(online);
            }
        })
    }

    /// Resolve once the debounced state equals `online`
    pub async fn wait_for(&self, online: bool) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state == online).await;
    }

    /// Ask the server directly and report the answer
    pub async fn probe(&self, api: &dyn SiteApi) -> bool {
        let reachable = api.ping().await;
        self.report(reachable);
        reachable
    }
}

/// Publishes "online" once the raw signal has held for `window`.
async fn settle_online(inner: Weak<Inner>, mut raw: watch::Receiver<bool>, window: Duration) {
    loop {
        if raw.changed().await.is_err() {
            return;
        }
        if !*raw.borrow_and_update() {
            continue;
        }

        let settled = loop {
            tokio::select! {
                _ = tokio::time::sleep(window) => break true,
                changed = raw.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !*raw.borrow_and_update() {
                        break false;
                    }
                }
            }
        };

        if settled {
            match inner.upgrade() {
                Some(inner) => inner.publish(true),
                None => return,
            }
        }
    }
}
