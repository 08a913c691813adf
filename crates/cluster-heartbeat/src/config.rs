/// Sender configuration.
///
/// `HeartbeatConfig` is the immutable per-sender configuration. `DaemonConfig`
/// is the TOML file read by the `cluster-heartbeat` binary; it produces a
/// `HeartbeatConfig` and seeds the shared timings.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use cluster_protocol::timing::HeartbeatTimings;
use cluster_protocol::{
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_MULTICAST_GROUP, DEFAULT_MULTICAST_PORT, DEFAULT_TTL,
};

/// Where and how far one sender advertises. Fixed for the sender's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    pub ttl: u8,
    /// Local interface for outgoing multicast (None = let the OS choose)
    pub interface: Option<Ipv4Addr>,
}

impl HeartbeatConfig {
    pub fn new(group: Ipv4Addr, port: u16, ttl: u8) -> Self {
        Self {
            group,
            port,
            ttl,
            interface: None,
        }
    }

    pub fn with_interface(mut self, interface: Ipv4Addr) -> Self {
        self.interface = Some(interface);
        self
    }

    pub fn destination(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.group, self.port)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.group.is_multicast() {
            bail!("{} is not a multicast group address", self.group);
        }
        if self.port == 0 {
            bail!("multicast port must not be 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub multicast: MulticastSection,
    #[serde(default)]
    pub heartbeat: HeartbeatSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeSection {
    /// URL this node advertises to its peers
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MulticastSection {
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_ttl")]
    pub ttl: u8,
    #[serde(default)]
    pub interface: Option<String>,
}

impl Default for MulticastSection {
    fn default() -> Self {
        Self {
            group: default_group(),
            port: default_port(),
            ttl: default_ttl(),
            interface: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatSection {
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    /// Negative or absent = derived from the interval
    #[serde(default)]
    pub stale_time_ms: Option<i64>,
}

impl Default for HeartbeatSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            stale_time_ms: None,
        }
    }
}

fn default_group() -> String { DEFAULT_MULTICAST_GROUP.to_string() }
fn default_port() -> u16 { DEFAULT_MULTICAST_PORT }
fn default_ttl() -> u8 { DEFAULT_TTL }
fn default_interval() -> u64 { DEFAULT_HEARTBEAT_INTERVAL_MS }

impl DaemonConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("invalid heartbeat configuration")?;
        config.heartbeat_config()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn heartbeat_config(&self) -> anyhow::Result<HeartbeatConfig> {
        let group: Ipv4Addr = self
            .multicast
            .group
            .parse()
            .with_context(|| format!("invalid multicast group {:?}", self.multicast.group))?;

        let mut config = HeartbeatConfig::new(group, self.multicast.port, self.multicast.ttl);
        if let Some(ref iface) = self.multicast.interface {
            let addr: Ipv4Addr = iface
                .parse()
                .with_context(|| format!("invalid interface address {:?}", iface))?;
            config = config.with_interface(addr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Push the configured interval and stale time into shared timings.
    pub fn apply_timings(&self, timings: &HeartbeatTimings) {
        timings.set_interval_ms(self.heartbeat.interval_ms);
        match self.heartbeat.stale_time_ms {
            Some(ms) => timings.set_stale_time_ms(ms),
            None => timings.clear_stale_time(),
        }
    }
}
