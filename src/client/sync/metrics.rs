//! # Drain Metrics
//!
//! Counters over reconciliation cycles, exposed through the sync status.

use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainMetrics {
    pub total_drains: u64,
    pub cancelled_drains: u64,
    pub records_synced: u64,
    pub records_failed: u64,
    pub average_drain_duration: Duration,
    pub last_drain_duration: Option<Duration>,
    total_drain_time: Duration,
}

impl DrainMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_drain(&mut self, duration: Duration, synced: usize, failed: usize, cancelled: bool) {
        self.total_drains += 1;
        self.records_synced += synced as u64;
        self.records_failed += failed as u64;
        if cancelled {
            self.cancelled_drains += 1;
        }
        self.last_drain_duration = Some(duration);

        self.total_drain_time = self.total_drain_time.saturating_add(duration);
        let average_nanos = self.total_drain_time.as_nanos() / u128::from(self.total_drains);
        self.average_drain_duration = Duration::from_nanos(u64::try_from(average_nanos).unwrap_or(u64::MAX));
    }

    pub fn success_rate(&self) -> f64 {
        let attempted = self.records_synced + self.records_failed;
        if attempted == 0 {
            0.0
        } else {
            self.records_synced as f64 / attempted as f64
        }
    }
}
