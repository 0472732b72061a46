use std::io::{Error, ErrorKind, Result};
use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket};
use tracing::debug;

use crate::addr::IpAddress;
use crate::ip::IpPacket;
use crate::packet::IPV4_HEADER_LEN;

pub trait PacketSender: Send {
    fn send(&mut self, packet: &[u8]) -> Result<usize>;
}

pub trait PacketReceiver: Send {
    fn set_deadline(&mut self, deadline: Duration) -> Result<()>;

    /// Receive one ICMP message into `buf`, returning its length and the
    /// address it came from. An expired deadline is reported as
    /// `WouldBlock` or `TimedOut`.
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, IpAddress)>;
}

/// Where the session gets its sockets from.
pub trait Transport: Send + Sync {
    fn sender(&self, destination: IpAddress) -> Result<Box<dyn PacketSender>>;
    fn receiver(&self, bind: IpAddress) -> Result<Box<dyn PacketReceiver>>;
}

pub fn is_deadline(e: &Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Raw ICMPv4 sockets. Needs CAP_NET_RAW (or root).
#[derive(Debug, Default, Clone, Copy)]
pub struct RawTransport;

fn raw_socket() -> Result<Socket> {
    let stype = socket2::Type::raw().cloexec();
    Socket::new(Domain::ipv4(), stype, Some(Protocol::icmpv4()))
}

fn sock_addr(addr: IpAddress) -> SockAddr {
    SockAddr::from(SocketAddr::V4(SocketAddrV4::new(addr.into(), 0)))
}

impl Transport for RawTransport {
    fn sender(&self, destination: IpAddress) -> Result<Box<dyn PacketSender>> {
        let socket = raw_socket()?;
        socket.connect(&sock_addr(destination))?;
        debug!(%destination, "raw socket connected");
        Ok(Box::new(RawSender { socket }))
    }

    fn receiver(&self, bind: IpAddress) -> Result<Box<dyn PacketReceiver>> {
        let socket = raw_socket()?;
        socket.bind(&sock_addr(bind))?;
        debug!(%bind, "raw socket bound");
        Ok(Box::new(RawReceiver { socket }))
    }
}

struct RawSender {
    socket: Socket,
}

impl PacketSender for RawSender {
    fn send(&mut self, packet: &[u8]) -> Result<usize> {
        self.socket.send(packet)
    }
}

struct RawReceiver {
    socket: Socket,
}

impl PacketReceiver for RawReceiver {
    fn set_deadline(&mut self, deadline: Duration) -> Result<()> {
        self.socket.set_read_timeout(Some(deadline))
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, IpAddress)> {
        let (n, from) = self.socket.recv_from(buf)?;
        let source = match from.as_inet() {
            Some(v4) => IpAddress::from(*v4.ip()),
            None => return Err(Error::new(ErrorKind::InvalidData, "non ipv4 source address")),
        };

        // Raw IPv4 sockets hand us the IP header too; the ICMP portion is
        // located after it.
        if n == 0 {
            return Ok((0, source));
        }
        let data_offset = IpPacket::header_len(buf[0]);
        if data_offset < IPV4_HEADER_LEN || data_offset > n {
            return Ok((0, source));
        }

        buf.copy_within(data_offset..n, 0);
        Ok((n - data_offset, source))
    }
}
