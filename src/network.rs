//! LAN address discovery.

use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Address reported when no route can be determined.
pub const LOOPBACK: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// Source of the address other devices on the LAN can reach us at.
pub trait NetworkIdentity: Send + Sync {
    /// IPv4 address as a string. Never fails; falls back to `127.0.0.1`.
    fn local_address(&self) -> String;
}

/// Finds the outbound interface by routing a UDP socket toward an external host.
///
/// `connect` on a UDP socket only selects a route, so no packet is sent.
#[derive(Debug, Clone)]
pub struct OutboundAddress {
    probe_target: String,
}

impl OutboundAddress {
    /// Use `probe_target` (`host:port`) to pick the route.
    pub fn new(probe_target: impl Into<String>) -> Self {
        Self {
            probe_target: probe_target.into(),
        }
    }

    /// Local address of the route toward the probe target.
    pub fn resolve(&self) -> io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(self.probe_target.as_str())?;
        Ok(socket.local_addr()?.ip())
    }
}

impl NetworkIdentity for OutboundAddress {
    fn local_address(&self) -> String {
        address_or_loopback(self.resolve())
    }
}

/// Format a resolved address, substituting loopback for failures and non-IPv4 results.
pub fn address_or_loopback(resolved: io::Result<IpAddr>) -> String {
    match resolved {
        Ok(IpAddr::V4(ip)) if !ip.is_unspecified() => ip.to_string(),
        Ok(other) => {
            tracing::debug!(address = %other, "Unusable local address, using loopback");
            LOOPBACK.to_string()
        }
        Err(e) => {
            tracing::debug!(error = %e, "No network route, using loopback");
            LOOPBACK.to_string()
        }
    }
}
