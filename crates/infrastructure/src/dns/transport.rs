//! Datagram transport for outstanding queries.
//!
//! Each query owns one non-blocking socket bound to an ephemeral port. An
//! IPv6 socket is preferred whenever IPv6 nameservers are configured; it is
//! kept dual-stack so IPv4 servers are reached through IPv4-mapped
//! addresses on the same socket. Otherwise a plain IPv4 socket is used.

use super::nameservers::NameserverRegistry;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, UdpSocket};
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

/// A bound, non-blocking UDP socket owned by exactly one query.
///
/// Dropping it closes the descriptor.
#[derive(Debug)]
pub struct QuerySocket {
    socket: UdpSocket,
    family: AddressFamily,
}

impl QuerySocket {
    /// Opens a socket suited to the configured nameservers.
    pub fn open(nameservers: &NameserverRegistry) -> io::Result<Self> {
        if nameservers.has_ipv6() {
            match Self::bind(AddressFamily::V6) {
                Ok(socket) => return Ok(socket),
                Err(e) => {
                    debug!(error = %e, "IPv6 socket unavailable, falling back to IPv4");
                }
            }
        }

        Self::bind(AddressFamily::V4)
    }

    fn bind(family: AddressFamily) -> io::Result<Self> {
        let (domain, bind_addr) = match family {
            AddressFamily::V6 => (
                Domain::IPV6,
                SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0)),
            ),
            AddressFamily::V4 => (
                Domain::IPV4,
                SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
            ),
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        if family == AddressFamily::V6 {
            socket.set_only_v6(false)?;
        }
        socket.set_nonblocking(true)?;
        socket.bind(&bind_addr.into())?;

        Ok(Self {
            socket: socket.into(),
            family,
        })
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn is_v6(&self) -> bool {
        self.family == AddressFamily::V6
    }

    pub fn raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sends `packet` to every nameserver this socket can reach.
    ///
    /// Succeeds when at least one transmission went out; otherwise returns
    /// the last send error.
    pub fn send_to_all(
        &self,
        packet: &[u8],
        nameservers: &NameserverRegistry,
        port: u16,
    ) -> io::Result<usize> {
        let mut sent = 0;
        let mut last_error = None;

        for target in self.targets(nameservers, port) {
            match self.socket.send_to(packet, target) {
                Ok(_) => sent += 1,
                Err(e) => {
                    debug!(server = %target, error = %e, "Failed to send DNS query");
                    last_error = Some(e);
                }
            }
        }

        if sent > 0 {
            return Ok(sent);
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no reachable nameservers configured")
        }))
    }

    fn targets(&self, nameservers: &NameserverRegistry, port: u16) -> Vec<SocketAddr> {
        match self.family {
            AddressFamily::V6 => nameservers
                .ipv6()
                .iter()
                .copied()
                .chain(nameservers.ipv4().iter().map(Ipv4Addr::to_ipv6_mapped))
                .map(|ip| SocketAddr::V6(SocketAddrV6::new(ip, port, 0, 0)))
                .collect(),
            AddressFamily::V4 => nameservers
                .ipv4()
                .iter()
                .map(|ip| SocketAddr::V4(SocketAddrV4::new(*ip, port)))
                .collect(),
        }
    }

    /// Reads one pending datagram into `buf`.
    ///
    /// Datagrams longer than `buf` are truncated by the kernel.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf)
    }
}
