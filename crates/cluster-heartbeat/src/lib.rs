pub mod config;
pub mod identity;
pub mod payload;
pub mod sender;
pub mod socket;
pub mod stats;

mod heartbeat;

pub use config::{DaemonConfig, HeartbeatConfig};
pub use identity::{ConfiguredIdentity, IdentitySource};
pub use sender::HeartbeatSender;
pub use socket::{MulticastSocket, SocketFactory, UdpSocketFactory};

pub use cluster_protocol::scope::MulticastScope;
pub use cluster_protocol::timing::HeartbeatTimings;
