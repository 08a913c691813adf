/// `clustercast listen`: print heartbeats seen on a multicast group.
///
/// Diagnostic only: it keeps the time of each source's previous heartbeat to
/// print the gap, but makes no liveness decisions.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use serde_json::json;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use cluster_protocol::payload::{decode_heartbeat, HeartbeatBody};
use cluster_protocol::MAX_DATAGRAM_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenOptions {
    pub group: Ipv4Addr,
    pub port: u16,
    pub interface: Ipv4Addr,
    pub count: Option<u64>,
}

impl ListenOptions {
    pub fn parse(
        group: &str,
        port: u16,
        interface: Option<&str>,
        count: Option<u64>,
    ) -> anyhow::Result<Self> {
        let group: Ipv4Addr = group
            .parse()
            .with_context(|| format!("invalid multicast group {:?}", group))?;
        if !group.is_multicast() {
            bail!("{} is not a multicast group address", group);
        }
        let interface = match interface {
            Some(iface) => iface
                .parse::<Ipv4Addr>()
                .with_context(|| format!("invalid interface address {:?}", iface))?,
            None => Ipv4Addr::UNSPECIFIED,
        };
        Ok(Self {
            group,
            port,
            interface,
            count,
        })
    }
}

/// Identifies one node across reconnects. Senders bind a new ephemeral
/// port per session, so the advertised URL is used when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Url(String),
    Address(IpAddr),
}

impl SourceKey {
    pub fn of(body: &HeartbeatBody, src: SocketAddr) -> Self {
        match body {
            HeartbeatBody::Url(url) => Self::Url(url.clone()),
            HeartbeatBody::Unknown => Self::Address(src.ip()),
        }
    }
}

/// Time since each source's previous heartbeat.
#[derive(Default)]
pub struct GapTracker {
    last_seen: HashMap<SourceKey, Instant>,
}

impl GapTracker {
    /// Record a heartbeat from `source` at `now`; returns the gap since the
    /// previous one from the same source.
    pub fn observe(&mut self, source: SourceKey, now: Instant) -> Option<Duration> {
        self.last_seen
            .insert(source, now)
            .map(|prev| now.saturating_duration_since(prev))
    }

    pub fn sources(&self) -> usize {
        self.last_seen.len()
    }
}

fn create_listener(options: &ListenOptions) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    // Share the port with a sender or other listeners on this host
    #[cfg(any(target_os = "macos", target_os = "freebsd"))]
    socket.set_reuse_port(true)?;

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, options.port);
    socket.bind(&addr.into())?;

    socket.join_multicast_v4(&options.group, &options.interface)?;

    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

pub async fn run(options: ListenOptions, json_output: bool) -> anyhow::Result<()> {
    let std_socket = create_listener(&options)
        .with_context(|| format!("failed to join {}:{}", options.group, options.port))?;
    let socket = UdpSocket::from_std(std_socket)?;

    info!(
        group = %options.group,
        port = options.port,
        interface = %options.interface,
        "Listening for heartbeats"
    );

    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let mut gaps = GapTracker::default();
    let mut received: u64 = 0;

    loop {
        if options.count.is_some_and(|count| received >= count) {
            break;
        }

        let (len, src) = socket.recv_from(&mut buf).await?;

        let Some(body) = decode_heartbeat(&buf[..len]) else {
            warn!(from = %src, bytes = len, "Ignoring datagram that is not a heartbeat");
            continue;
        };
        received += 1;

        let gap = gaps.observe(SourceKey::of(&body, src), Instant::now());
        let url = match body {
            HeartbeatBody::Url(ref url) => url.as_str(),
            HeartbeatBody::Unknown => "<unknown>",
        };

        if json_output {
            let out = json!({
                "from": src.to_string(),
                "url": body.url(),
                "gap_ms": gap.map(|g| g.as_millis() as u64),
            });
            println!("{}", out);
        } else {
            match gap {
                Some(gap) => println!("{:<22} {}  (+{} ms)", src, url, gap.as_millis()),
                None => println!("{:<22} {}  (first)", src, url),
            }
        }

        debug!(sources = gaps.sources(), received = received, "Heartbeat received");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let options = ListenOptions::parse("230.0.0.1", 4446, Some("10.0.0.5"), Some(3)).unwrap();
        assert_eq!(options.group, Ipv4Addr::new(230, 0, 0, 1));
        assert_eq!(options.interface, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(options.count, Some(3));

        let options = ListenOptions::parse("230.0.0.1", 4446, None, None).unwrap();
        assert_eq!(options.interface, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn test_reject_non_multicast_group() {
        assert!(ListenOptions::parse("192.168.1.1", 4446, None, None).is_err());
        assert!(ListenOptions::parse("not-an-ip", 4446, None, None).is_err());
    }

    #[test]
    fn test_gap_per_source() {
        let a = SourceKey::Url("//10.0.0.1:40001/eventbus".to_string());
        let b = SourceKey::Url("//10.0.0.2:40001/eventbus".to_string());
        let t0 = Instant::now();

        let mut gaps = GapTracker::default();
        assert_eq!(gaps.observe(a.clone(), t0), None);
        assert_eq!(gaps.observe(b, t0 + Duration::from_millis(300)), None);
        assert_eq!(
            gaps.observe(a, t0 + Duration::from_millis(5000)),
            Some(Duration::from_millis(5000))
        );
        assert_eq!(gaps.sources(), 2);
    }

    #[test]
    fn test_gap_survives_sender_port_change() {
        let body = HeartbeatBody::Url("//10.0.0.1:40001/eventbus".to_string());
        let before: SocketAddr = "10.0.0.1:50000".parse().unwrap();
        let after: SocketAddr = "10.0.0.1:50123".parse().unwrap();
        let t0 = Instant::now();

        let mut gaps = GapTracker::default();
        assert_eq!(gaps.observe(SourceKey::of(&body, before), t0), None);
        assert_eq!(
            gaps.observe(SourceKey::of(&body, after), t0 + Duration::from_millis(2000)),
            Some(Duration::from_millis(2000))
        );
        assert_eq!(gaps.sources(), 1);
    }

    #[test]
    fn test_unknown_body_keyed_by_ip() {
        let before: SocketAddr = "10.0.0.7:50000".parse().unwrap();
        let after: SocketAddr = "10.0.0.7:50999".parse().unwrap();
        let other: SocketAddr = "10.0.0.8:50000".parse().unwrap();

        assert_eq!(
            SourceKey::of(&HeartbeatBody::Unknown, before),
            SourceKey::of(&HeartbeatBody::Unknown, after)
        );
        assert_ne!(
            SourceKey::of(&HeartbeatBody::Unknown, before),
            SourceKey::of(&HeartbeatBody::Unknown, other)
        );
    }
}
