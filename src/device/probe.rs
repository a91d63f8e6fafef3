use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

/// Checks a fixed list of loopback ports for a listener.
///
/// This is a liveness check, not a handshake: any process listening on one of
/// the ports counts as a content server.
#[derive(Debug, Clone)]
pub struct PortProbe {
    ports: Vec<u16>,
    timeout: Duration,
}

impl PortProbe {
    /// Probe `ports` in order, waiting at most `timeout` on each.
    pub fn new(ports: Vec<u16>, timeout: Duration) -> Self {
        Self { ports, timeout }
    }

    /// First port accepting a connection.
    pub fn first_open_port(&self) -> Option<u16> {
        self.ports.iter().copied().find(|&port| {
            let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_) => {
                    tracing::debug!(port = port, "Found listener");
                    true
                }
                Err(e) => {
                    tracing::trace!(port = port, error = %e, "Nothing listening");
                    false
                }
            }
        })
    }
}
