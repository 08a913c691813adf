pub mod payload;
pub mod scope;
pub mod timing;

/// Default multicast group for heartbeat advertisement
pub const DEFAULT_MULTICAST_GROUP: &str = "230.0.0.1";

/// Default multicast port
pub const DEFAULT_MULTICAST_PORT: u16 = 4446;

/// Default multicast TTL (same subnet)
pub const DEFAULT_TTL: u8 = 1;

/// Heartbeat defaults
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 5000;
pub const MINIMUM_HEARTBEAT_INTERVAL_MS: u64 = 1000;

/// Slack added on top of two missed intervals when deriving the stale time.
pub const STALE_TIME_SLACK_MS: u64 = 100;

/// Largest heartbeat body a receiver needs to buffer (one MTU).
pub const MAX_DATAGRAM_SIZE: usize = 1500;
