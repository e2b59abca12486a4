//! RIC endpoint addressing: from TNL information and from controller configuration.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use ransim_common::{Controller, Error, Result, DEFAULT_E2AP_PORT};
use ransim_e2ap::TnlInformation;

use crate::store::ConnectionId;

/// Resolved address of a RIC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RicAddress {
    pub ip: IpAddr,
    pub port: u16,
}

impl RicAddress {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Derives the address from TNL information.
    ///
    /// Returns `None` when the address octets are neither IPv4 (4), IPv6 (16)
    /// nor IPv4+IPv6 (20); the IPv4 part wins in the dual case. A missing port
    /// means the default E2AP port.
    pub fn from_tnl(tnl: &TnlInformation) -> Option<Self> {
        let ip = match tnl.address.len() {
            4 | 20 => {
                let octets: [u8; 4] = tnl.address[..4].try_into().ok()?;
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            16 => {
                let octets: [u8; 16] = tnl.address[..].try_into().ok()?;
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            _ => return None,
        };
        let port = tnl.port.unwrap_or(DEFAULT_E2AP_PORT);
        if port == 0 {
            return None;
        }
        Some(Self { ip, port })
    }

    /// Resolves a configured controller, looking the hostname up if needed.
    pub async fn resolve(controller: &Controller) -> Result<Self> {
        if let Ok(ip) = controller.address.parse::<IpAddr>() {
            return Ok(Self::new(ip, controller.port));
        }
        let mut addrs = tokio::net::lookup_host((controller.address.as_str(), controller.port)).await?;
        addrs
            .next()
            .map(Self::from)
            .ok_or_else(|| Error::NotFound(format!("no address for controller {}", controller.id)))
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Connection store key of this endpoint.
    pub fn connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.ip.to_string(), u64::from(self.port))
    }
}

impl From<SocketAddr> for RicAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl fmt::Display for RicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}
