//! # Retry Policy and Backoff
//!
//! Decides when a record that failed transiently is replayed again without
//! the user asking.
//!
//! - Exponential backoff from the record's last attempt, capped.
//! - Jitter derived from the record id, so a batch that failed together does
//!   not come back together, while a single record's schedule stays stable.
//! - A cap on automatic attempts. Past it the record stays `failed` and only
//!   a manual retry re-arms it. Rejected records are never re-armed.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::shared::config::SyncConfig;
use crate::shared::record::{FailureKind, PendingRecord, RecordStatus};

/// Backoff strategy configuration
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed interval between retries
    Fixed { interval: Duration },
    /// Exponential backoff with jitter
    Exponential {
        base: Duration,
        max: Duration,
        /// Jitter factor (0.0 to 1.0)
        jitter: f64,
    },
}

/// Automatic retry policy for failed records
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// `None` = unlimited automatic retries
    pub max_auto_attempts: Option<u32>,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_auto_attempts: config.max_auto_attempts,
            backoff: BackoffStrategy::Exponential {
                base: config.backoff_base,
                max: config.backoff_max,
                jitter: 0.1,
            },
        }
    }

    /// Re-arm immediately, forever
    pub fn immediate() -> Self {
        Self {
            max_auto_attempts: None,
            backoff: BackoffStrategy::Fixed {
                interval: Duration::ZERO,
            },
        }
    }

    /// Delay before automatic replay number `attempts + 1`, without jitter
    pub fn base_delay(&self, attempts: u32) -> Duration {
        match &self.backoff {
            BackoffStrategy::Fixed { interval } => *interval,
            BackoffStrategy::Exponential { base, max, .. } => {
                let exponent = attempts.saturating_sub(1).min(31);
                base.saturating_mul(1u32 << exponent).min(*max)
            }
        }
    }

    /// Delay including the record's jitter
    pub fn delay_for(&self, record: &PendingRecord) -> Duration {
        let delay = self.base_delay(record.attempts);
        match &self.backoff {
            BackoffStrategy::Exponential { jitter, .. } if *jitter > 0.0 => {
                let fraction = (record.id.as_u128() % 1000) as f64 / 1000.0;
                delay + delay.mul_f64(jitter.clamp(0.0, 1.0) * fraction)
            }
            _ => delay,
        }
    }

    /// When the record becomes eligible for automatic replay; `None` = never
    pub fn next_attempt_at(&self, record: &PendingRecord) -> Option<DateTime<Utc>> {
        if record.status != RecordStatus::Failed {
            return None;
        }
        if record.failure_kind == Some(FailureKind::Rejected) {
            return None;
        }
        if let Some(max) = self.max_auto_attempts {
            if record.attempts >= max {
                return None;
            }
        }

        let since = record.last_attempt_at.unwrap_or(record.created_at);
        let delay = chrono::Duration::from_std(self.delay_for(record)).unwrap_or(chrono::Duration::MAX);
        Some(since.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Whether a drain starting at `now` should re-arm this record
    pub fn should_rearm(&self, record: &PendingRecord, now: DateTime<Utc>) -> bool {
        self.next_attempt_at(record).is_some_and(|at| at <= now)
    }
}
