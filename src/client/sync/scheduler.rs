//! # Drain Scheduler
//!
//! Decides when the periodic fallback timer should actually start a drain.
//! Reconnect events drain immediately; the timer only covers the case where
//! the link stayed up but a drain is still owed (failed records whose backoff
//! elapsed, writes queued after a server outage).

use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Periodic drain scheduler
#[derive(Debug)]
pub struct DrainScheduler {
    /// Last completed drain
    last_drain: RwLock<Option<Instant>>,
    /// Minimum gap between timer-driven drains
    interval: Duration,
}

impl DrainScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_drain: RwLock::new(None),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the timer should drain now
    pub async fn should_drain(&self) -> bool {
        match *self.last_drain.read().await {
            Some(time) => time.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Record a finished drain, whatever triggered it
    pub async fn record_drain(&self) {
        *self.last_drain.write().await = Some(Instant::now());
    }

    /// Get time until the timer would drain again
    pub async fn time_until_next_drain(&self) -> Duration {
        match *self.last_drain.read().await {
            Some(last) => self.interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }
}
