/// Heartbeat loop: the background task behind `HeartbeatSender`.
///
/// State machine:
///
/// ```text
///  Opening ──ok──▶ Joined ──▶ Sending ⟲ (one heartbeat per interval)
///     │                          │
///     └──err──▶ Backoff ◀──err───┘        any state ──cancel──▶ Closed
///                  │
///                  └──after one interval──▶ Opening
/// ```
///
/// Every exit from `Sending` tears the session down (leave group, close).
/// Errors and panics never leave this task. They are logged and counted, and
/// the session is retried after one interval.

use std::net::Ipv4Addr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use cluster_protocol::scope::MulticastScope;
use cluster_protocol::timing::HeartbeatTimings;

use crate::config::HeartbeatConfig;
use crate::payload::PayloadBuilder;
use crate::socket::{MulticastSocket, SocketFactory};
use crate::stats::SenderStats;

enum LoopState<S> {
    Opening,
    Joined(S),
    Sending(S),
    Backoff,
    Closed,
}

enum SendOutcome {
    /// Heartbeat sent and the interval elapsed
    Sent,
    /// I/O or payload failure; reconnect after backoff
    Failed,
    Shutdown,
}

pub(crate) struct HeartbeatLoop<F: SocketFactory> {
    pub(crate) config: HeartbeatConfig,
    pub(crate) timings: Arc<HeartbeatTimings>,
    pub(crate) factory: F,
    pub(crate) payload: PayloadBuilder,
    pub(crate) refresh: Arc<AtomicBool>,
    pub(crate) stats: Arc<SenderStats>,
    pub(crate) cancel: CancellationToken,
}

impl<F: SocketFactory> HeartbeatLoop<F> {
    pub(crate) async fn run(mut self) {
        info!(
            group = %self.config.group,
            port = self.config.port,
            ttl = self.config.ttl,
            scope = %MulticastScope::from_ttl(self.config.ttl),
            interval_ms = self.timings.interval_ms(),
            "Heartbeat sender started"
        );

        let mut state = LoopState::Opening;

        loop {
            state = match state {
                LoopState::Opening => {
                    if self.cancel.is_cancelled() {
                        LoopState::Closed
                    } else {
                        match panic::catch_unwind(AssertUnwindSafe(|| self.open_session())) {
                            Ok(Ok(socket)) => LoopState::Joined(socket),
                            Ok(Err(e)) => {
                                self.stats.record_session_failure();
                                warn!(
                                    group = %self.config.group,
                                    error = %e,
                                    "Failed to open multicast session"
                                );
                                LoopState::Backoff
                            }
                            Err(_) => {
                                self.stats.record_session_failure();
                                self.stats.record_unexpected_error();
                                error!(
                                    group = %self.config.group,
                                    "Socket setup panicked, reconnecting after backoff"
                                );
                                LoopState::Backoff
                            }
                        }
                    }
                }
                LoopState::Joined(socket) => {
                    self.stats.record_session_opened();
                    info!(
                        group = %self.config.group,
                        interface = %self.join_interface(),
                        "Joined multicast group"
                    );
                    LoopState::Sending(socket)
                }
                LoopState::Sending(mut socket) => {
                    // A panic inside the session is handled like a send failure
                    let result = AssertUnwindSafe(self.send_once(&mut socket))
                        .catch_unwind()
                        .await;
                    let outcome = match result {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            self.stats.record_unexpected_error();
                            error!(
                                group = %self.config.group,
                                "Heartbeat session panicked, reconnecting after backoff"
                            );
                            SendOutcome::Failed
                        }
                    };
                    match outcome {
                        SendOutcome::Sent => LoopState::Sending(socket),
                        SendOutcome::Failed => {
                            self.teardown(socket);
                            LoopState::Backoff
                        }
                        SendOutcome::Shutdown => {
                            self.teardown(socket);
                            LoopState::Closed
                        }
                    }
                }
                LoopState::Backoff => {
                    let interval = self.timings.interval();
                    debug!(backoff_ms = interval.as_millis() as u64, "Reconnecting after backoff");
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => LoopState::Closed,
                        _ = tokio::time::sleep(interval) => LoopState::Opening,
                    }
                }
                LoopState::Closed => break,
            };
        }

        info!(group = %self.config.group, "Heartbeat sender stopped");
    }

    fn join_interface(&self) -> Ipv4Addr {
        self.config.interface.unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    /// Create a socket, bind the interface, set TTL, then join the group.
    /// A failure at any step drops (closes) the partially set up socket.
    fn open_session(&self) -> std::io::Result<F::Socket> {
        let mut socket = self.factory.create()?;
        if let Some(interface) = self.config.interface {
            socket.set_multicast_interface(interface)?;
        }
        socket.set_multicast_ttl(self.config.ttl)?;
        socket.join_group(self.config.group, self.join_interface())?;
        Ok(socket)
    }

    async fn send_once(&mut self, socket: &mut F::Socket) -> SendOutcome {
        if self.cancel.is_cancelled() {
            return SendOutcome::Shutdown;
        }

        if self.refresh.swap(false, Ordering::AcqRel) {
            debug!("Identity refresh requested, rebuilding heartbeat payload");
            self.payload.invalidate();
        }

        let payload = match self.payload.payload() {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.record_unexpected_error();
                error!(error = ?e, "Unexpected error building heartbeat, reconnecting");
                return SendOutcome::Failed;
            }
        };

        let dest = self.config.destination();
        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return SendOutcome::Shutdown,
            result = socket.send_to(payload, dest) => result,
        };

        match sent {
            Ok(len) => {
                self.stats.record_sent();
                debug!(dest = %dest, bytes = len, "Sent heartbeat");
            }
            Err(e) => {
                self.stats.record_send_failure();
                warn!(dest = %dest, error = %e, "Failed to send heartbeat");
                return SendOutcome::Failed;
            }
        }

        // Re-read every iteration so interval changes apply from the next wait
        let interval = self.timings.interval();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => SendOutcome::Shutdown,
            _ = tokio::time::sleep(interval) => SendOutcome::Sent,
        }
    }

    fn teardown(&self, socket: F::Socket) {
        let closed = panic::catch_unwind(AssertUnwindSafe(move || {
            let mut socket = socket;
            if let Err(e) = socket.leave_group(self.config.group, self.join_interface()) {
                warn!(group = %self.config.group, error = %e, "Failed to leave multicast group");
            }
        }));
        match closed {
            Ok(()) => debug!(group = %self.config.group, "Multicast session closed"),
            Err(_) => {
                self.stats.record_unexpected_error();
                error!(group = %self.config.group, "Multicast session teardown panicked");
            }
        }
    }
}
