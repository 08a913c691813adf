//! End-to-end test over a real multicast group.
//!
//! Needs an interface with multicast enabled and loopback delivery, which
//! many CI sandboxes lack. Run with `cargo test -- --ignored`.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use cluster_heartbeat::{ConfiguredIdentity, HeartbeatConfig, HeartbeatSender, HeartbeatTimings};
use cluster_protocol::payload::decode_heartbeat;
use cluster_protocol::MAX_DATAGRAM_SIZE;

const GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 77, 77);

fn listener(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket.bind(&addr.into())?;
    socket.join_multicast_v4(&GROUP, &Ipv4Addr::UNSPECIFIED)?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

#[tokio::test]
#[ignore = "requires a multicast-capable network interface"]
async fn listener_receives_heartbeat_and_silence_after_stop() {
    let port = 47_000 + (std::process::id() % 1000) as u16;
    let socket = listener(port).unwrap();

    let timings = Arc::new(HeartbeatTimings::with_interval_ms(1000));
    let identity = Arc::new(ConfiguredIdentity::new(Some("peer-A".to_string())));
    let mut sender = HeartbeatSender::new(HeartbeatConfig::new(GROUP, port, 0), identity, timings);
    sender.start();

    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let (len, _) = tokio::time::timeout(Duration::from_millis(1000), socket.recv_from(&mut buf))
        .await
        .expect("no heartbeat within one interval")
        .unwrap();
    assert_eq!(decode_heartbeat(&buf[..len]).unwrap().url(), Some("peer-A"));

    sender.shutdown().await;

    let late = tokio::time::timeout(Duration::from_millis(2000), socket.recv_from(&mut buf)).await;
    assert!(late.is_err(), "heartbeat received after shutdown");
}
