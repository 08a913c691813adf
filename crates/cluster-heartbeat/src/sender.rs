/// Heartbeat sender controller.
///
/// Owns the configuration and the lifecycle of one heartbeat loop. The loop
/// runs as a detached tokio task; `stop()` only signals it, `shutdown()` also
/// waits for the socket teardown to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cluster_protocol::scope::MulticastScope;
use cluster_protocol::timing::HeartbeatTimings;

use crate::config::HeartbeatConfig;
use crate::heartbeat::HeartbeatLoop;
use crate::identity::IdentitySource;
use crate::payload::PayloadBuilder;
use crate::socket::{SocketFactory, UdpSocketFactory};
use crate::stats::{SenderStats, StatsSnapshot};

pub struct HeartbeatSender<F: SocketFactory = UdpSocketFactory> {
    config: HeartbeatConfig,
    timings: Arc<HeartbeatTimings>,
    identity: Arc<dyn IdentitySource>,
    /// Taken by `start()`; a sender runs at most once
    factory: Option<F>,
    cancel: CancellationToken,
    refresh: Arc<AtomicBool>,
    stats: Arc<SenderStats>,
    handle: Option<JoinHandle<()>>,
}

impl HeartbeatSender<UdpSocketFactory> {
    pub fn new(
        config: HeartbeatConfig,
        identity: Arc<dyn IdentitySource>,
        timings: Arc<HeartbeatTimings>,
    ) -> Self {
        Self::with_factory(config, identity, timings, UdpSocketFactory::default())
    }
}

impl<F: SocketFactory> HeartbeatSender<F> {
    pub fn with_factory(
        config: HeartbeatConfig,
        identity: Arc<dyn IdentitySource>,
        timings: Arc<HeartbeatTimings>,
        factory: F,
    ) -> Self {
        Self {
            config,
            timings,
            identity,
            factory: Some(factory),
            cancel: CancellationToken::new(),
            refresh: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SenderStats::default()),
            handle: None,
        }
    }

    /// Spawn the heartbeat loop and return immediately.
    ///
    /// Must be called from within a tokio runtime. Starting twice, or after
    /// `stop()`, is ignored with a warning.
    pub fn start(&mut self) {
        if self.cancel.is_cancelled() {
            warn!("Heartbeat sender was stopped and cannot be restarted");
            return;
        }
        let Some(factory) = self.factory.take() else {
            warn!("Heartbeat sender already started");
            return;
        };

        let heartbeat = HeartbeatLoop {
            config: self.config,
            timings: Arc::clone(&self.timings),
            factory,
            payload: PayloadBuilder::new(Arc::clone(&self.identity), Arc::clone(&self.stats)),
            refresh: Arc::clone(&self.refresh),
            stats: Arc::clone(&self.stats),
            cancel: self.cancel.clone(),
        };

        self.handle = Some(tokio::spawn(heartbeat.run()));
    }

    /// Signal the loop to stop. No new heartbeat is started after this
    /// returns; socket teardown may still be in progress.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            info!(group = %self.config.group, "Stopping heartbeat sender");
            self.cancel.cancel();
        }
    }

    /// Stop and wait until the loop has released its socket.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Heartbeat task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Rebuild the advertised payload from the identity source before the
    /// next heartbeat. Without this the payload is computed once.
    pub fn refresh_identity(&self) {
        self.refresh.store(true, Ordering::Release);
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    pub fn time_to_live(&self) -> u8 {
        self.config.ttl
    }

    pub fn scope(&self) -> MulticastScope {
        MulticastScope::from_ttl(self.config.ttl)
    }

    pub fn timings(&self) -> &Arc<HeartbeatTimings> {
        &self.timings
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<F: SocketFactory> Drop for HeartbeatSender<F> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
