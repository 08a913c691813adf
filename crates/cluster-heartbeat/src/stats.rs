/// Sender counters.
/// Updated by the heartbeat loop, read by whoever owns the sender.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct SenderStats {
    pub heartbeats_sent: AtomicU64,
    pub send_failures: AtomicU64,
    pub sessions_opened: AtomicU64,
    pub session_failures: AtomicU64,
    pub identity_failures: AtomicU64,
    /// Panics or payload errors that forced a reconnect
    pub unexpected_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub heartbeats_sent: u64,
    pub send_failures: u64,
    pub sessions_opened: u64,
    pub session_failures: u64,
    pub identity_failures: u64,
    pub unexpected_errors: u64,
}

impl SenderStats {
    pub fn record_sent(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_failure(&self) {
        self.session_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_identity_failure(&self) {
        self.identity_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unexpected_error(&self) {
        self.unexpected_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            session_failures: self.session_failures.load(Ordering::Relaxed),
            identity_failures: self.identity_failures.load(Ordering::Relaxed),
            unexpected_errors: self.unexpected_errors.load(Ordering::Relaxed),
        }
    }
}
