use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::error::{Result, SockError};

/// Address family of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketDomain {
    /// TCP/IP v4.
    Inet,
    /// TCP/IP v6.
    Inet6,
}

impl SocketDomain {
    pub(crate) fn as_raw(self) -> libc::c_int {
        match self {
            SocketDomain::Inet => libc::AF_INET,
            SocketDomain::Inet6 => libc::AF_INET6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SocketDomain::Inet => "inet",
            SocketDomain::Inet6 => "inet6",
        }
    }
}

impl fmt::Display for SocketDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Socket type of an endpoint. Only stream sockets carry RPC frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    Stream,
}

impl SocketType {
    pub(crate) fn as_raw(self) -> libc::c_int {
        match self {
            SocketType::Stream => libc::SOCK_STREAM,
        }
    }
}

/// Immutable socket configuration: who to connect to or where to listen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    domain: SocketDomain,
    socket_type: SocketType,
    ip: String,
    port: u16,
}

impl Endpoint {
    /// Fixed local address used by listening endpoints.
    pub const LOCAL_IP: &'static str = "127.0.0.1";

    pub fn new(domain: SocketDomain, socket_type: SocketType, ip: impl Into<String>, port: u16) -> Self {
        Self {
            domain,
            socket_type,
            ip: ip.into(),
            port,
        }
    }

    /// IPv4 TCP endpoint for a client.
    pub fn tcp(ip: impl Into<String>, port: u16) -> Self {
        Self::new(SocketDomain::Inet, SocketType::Stream, ip, port)
    }

    /// IPv4 TCP endpoint for a server on the fixed local address.
    pub fn local(port: u16) -> Self {
        Self::tcp(Self::LOCAL_IP, port)
    }

    pub fn domain(&self) -> SocketDomain {
        self.domain
    }

    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Registry key: `ip:port`.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Resolve the remote address for `connect`.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let invalid = || SockError::InvalidAddress {
            ip: self.ip.clone(),
            domain: self.domain.name(),
        };
        let ip: IpAddr = self.ip.parse().map_err(|_| invalid())?;
        match (self.domain, ip) {
            (SocketDomain::Inet, IpAddr::V4(_)) | (SocketDomain::Inet6, IpAddr::V6(_)) => {
                Ok(SocketAddr::new(ip, self.port))
            }
            _ => Err(invalid()),
        }
    }

    /// Wildcard address for `bind` on the configured port.
    pub fn wildcard_addr(&self) -> SocketAddr {
        match self.domain {
            SocketDomain::Inet => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port),
            SocketDomain::Inet6 => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), self.port),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_ip_and_port() {
        let endpoint = Endpoint::tcp("10.0.0.7", 4242);
        assert_eq!(endpoint.identity(), "10.0.0.7:4242");
        assert_eq!(endpoint.to_string(), endpoint.identity());
    }

    #[test]
    fn local_endpoint_uses_loopback() {
        let endpoint = Endpoint::local(42);
        assert_eq!(endpoint.ip(), "127.0.0.1");
        assert_eq!(endpoint.domain(), SocketDomain::Inet);
        assert_eq!(endpoint.wildcard_addr().to_string(), "0.0.0.0:42");
    }

    #[test]
    fn socket_addr_rejects_mismatched_family() {
        let endpoint = Endpoint::new(SocketDomain::Inet, SocketType::Stream, "::1", 80);
        assert!(matches!(
            endpoint.socket_addr(),
            Err(SockError::InvalidAddress { .. })
        ));

        let endpoint = Endpoint::new(SocketDomain::Inet6, SocketType::Stream, "::1", 80);
        assert_eq!(endpoint.socket_addr().unwrap().to_string(), "[::1]:80");
    }

    #[test]
    fn socket_addr_rejects_garbage() {
        let endpoint = Endpoint::tcp("not-an-ip", 1);
        let err = endpoint.socket_addr().unwrap_err();
        assert_eq!(err.code(), "InvalidAddress");
    }
}
