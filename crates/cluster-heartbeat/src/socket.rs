/// Multicast socket seam.
///
/// The heartbeat loop drives sockets only through these traits so the
/// open / TTL / join / send / leave sequence can be observed and failures
/// scripted without a network.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddrV4};

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::UdpSocket;

/// One live multicast socket, owned by a single session.
/// Dropping it closes the socket.
pub trait MulticastSocket: Send + 'static {
    fn set_multicast_interface(&mut self, interface: Ipv4Addr) -> std::io::Result<()>;

    fn set_multicast_ttl(&mut self, ttl: u8) -> std::io::Result<()>;

    fn join_group(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> std::io::Result<()>;

    fn leave_group(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> std::io::Result<()>;

    fn send_to<'a>(
        &'a mut self,
        buf: &'a [u8],
        dest: SocketAddrV4,
    ) -> impl Future<Output = std::io::Result<usize>> + Send + 'a;
}

/// Creates a fresh socket for each session.
pub trait SocketFactory: Send + Sync + 'static {
    type Socket: MulticastSocket;

    fn create(&self) -> std::io::Result<Self::Socket>;
}

/// Production factory: UDP sockets configured with socket2 and driven by tokio.
#[derive(Debug, Clone)]
pub struct UdpSocketFactory {
    /// Deliver our own heartbeats to listeners on this host
    pub loopback: bool,
}

impl Default for UdpSocketFactory {
    fn default() -> Self {
        Self { loopback: true }
    }
}

impl SocketFactory for UdpSocketFactory {
    type Socket = UdpMulticastSocket;

    fn create(&self) -> std::io::Result<UdpMulticastSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_multicast_loop_v4(self.loopback)?;

        // Ephemeral source port; we only send
        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
        socket.bind(&addr.into())?;

        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket.into())?;
        Ok(UdpMulticastSocket { socket })
    }
}

#[derive(Debug)]
pub struct UdpMulticastSocket {
    socket: UdpSocket,
}

impl MulticastSocket for UdpMulticastSocket {
    fn set_multicast_interface(&mut self, interface: Ipv4Addr) -> std::io::Result<()> {
        SockRef::from(&self.socket).set_multicast_if_v4(&interface)
    }

    fn set_multicast_ttl(&mut self, ttl: u8) -> std::io::Result<()> {
        self.socket.set_multicast_ttl_v4(u32::from(ttl))
    }

    fn join_group(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> std::io::Result<()> {
        self.socket.join_multicast_v4(group, interface)
    }

    fn leave_group(&mut self, group: Ipv4Addr, interface: Ipv4Addr) -> std::io::Result<()> {
        self.socket.leave_multicast_v4(group, interface)
    }

    fn send_to<'a>(
        &'a mut self,
        buf: &'a [u8],
        dest: SocketAddrV4,
    ) -> impl Future<Output = std::io::Result<usize>> + Send + 'a {
        self.socket.send_to(buf, dest)
    }
}
