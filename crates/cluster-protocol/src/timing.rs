/// Heartbeat interval and stale-time tunables.
///
/// Shared between every sender that holds the same `Arc<HeartbeatTimings>`.
/// Reads and writes are relaxed atomics: the last writer wins, and a running
/// sender picks up a new interval on its next iteration.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

use crate::{DEFAULT_HEARTBEAT_INTERVAL_MS, MINIMUM_HEARTBEAT_INTERVAL_MS, STALE_TIME_SLACK_MS};

/// Stale time a receiver should apply for a given interval when no override
/// is set: two missed heartbeats plus slack for network delay.
pub fn derived_stale_time_ms(interval_ms: u64) -> u64 {
    interval_ms
        .saturating_mul(2)
        .saturating_add(STALE_TIME_SLACK_MS)
}

#[derive(Debug)]
pub struct HeartbeatTimings {
    interval_ms: AtomicU64,
    /// Negative = no override
    stale_time_ms: AtomicI64,
}

impl Default for HeartbeatTimings {
    fn default() -> Self {
        Self {
            interval_ms: AtomicU64::new(DEFAULT_HEARTBEAT_INTERVAL_MS),
            stale_time_ms: AtomicI64::new(-1),
        }
    }
}

impl HeartbeatTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create timings with the given interval (clamped like `set_interval_ms`).
    pub fn with_interval_ms(interval_ms: u64) -> Self {
        let timings = Self::default();
        timings.set_interval_ms(interval_ms);
        timings
    }

    /// Set the heartbeat interval. Values below the 1000 ms floor are raised
    /// to the floor.
    pub fn set_interval_ms(&self, interval_ms: u64) {
        let effective = if interval_ms < MINIMUM_HEARTBEAT_INTERVAL_MS {
            warn!(
                requested_ms = interval_ms,
                minimum_ms = MINIMUM_HEARTBEAT_INTERVAL_MS,
                "Heartbeat interval too low, using minimum"
            );
            MINIMUM_HEARTBEAT_INTERVAL_MS
        } else {
            interval_ms
        };
        self.interval_ms.store(effective, Ordering::Relaxed);
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }

    /// Override the stale time. A negative value removes the override.
    pub fn set_stale_time_ms(&self, stale_time_ms: i64) {
        self.stale_time_ms.store(stale_time_ms, Ordering::Relaxed);
    }

    pub fn clear_stale_time(&self) {
        self.stale_time_ms.store(-1, Ordering::Relaxed);
    }

    /// Explicit override, if one is set.
    pub fn stale_time_override_ms(&self) -> Option<u64> {
        let value = self.stale_time_ms.load(Ordering::Relaxed);
        u64::try_from(value).ok()
    }

    /// Time after which a receiver should consider this sender's last
    /// heartbeat too old to trust.
    pub fn stale_time_ms(&self) -> u64 {
        self.stale_time_override_ms()
            .unwrap_or_else(|| derived_stale_time_ms(self.interval_ms()))
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms())
    }
}
