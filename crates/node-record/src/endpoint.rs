//! Observed network endpoints and the record pairs that advertise them.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use node_record_core::keys;

/// An (IP, UDP port) pair, typically proposed by an address-learning subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub udp_port: u16,
}

impl Endpoint {
    pub fn new(ip: impl Into<IpAddr>, udp_port: u16) -> Self {
        Self {
            ip: ip.into(),
            udp_port,
        }
    }

    /// The key/value pairs advertising this endpoint.
    ///
    /// IPv4 endpoints use `ip`/`udp`, IPv6 endpoints use `ip6`/`udp6`.
    pub fn to_pairs(&self) -> [(Bytes, Bytes); 2] {
        let port = Bytes::from(keys::encode_port(self.udp_port));
        match self.ip {
            IpAddr::V4(ip) => [
                (Bytes::from_static(keys::IP), Bytes::copy_from_slice(&ip.octets())),
                (Bytes::from_static(keys::UDP), port),
            ],
            IpAddr::V6(ip) => [
                (Bytes::from_static(keys::IP6), Bytes::copy_from_slice(&ip.octets())),
                (Bytes::from_static(keys::UDP6), port),
            ],
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(endpoint: Endpoint) -> Self {
        SocketAddr::new(endpoint.ip, endpoint.udp_port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        SocketAddr::from(*self).fmt(f)
    }
}
