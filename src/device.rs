//! Reader device and content server detection.

mod probe;
mod usb;

pub use probe::PortProbe;
pub use usb::{CopyReport, UsbScanner, copy_to_device};

use crate::network::{LOOPBACK, NetworkIdentity};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// A mounted reader volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Volume name.
    pub name: String,
    /// Mount point.
    pub mount_path: PathBuf,
    /// Whether the device was seen connected.
    pub connected: bool,
}

/// Finds delivery targets in the local environment.
pub trait DeviceDiscovery: Send + Sync {
    /// First mounted volume that looks like a reader, if any.
    fn find_usb_device(&self) -> Option<DeviceInfo>;

    /// Base URL of a content server already listening locally, if any.
    ///
    /// With `for_remote` the URL uses the LAN address instead of loopback.
    fn find_content_server_endpoint(&self, for_remote: bool) -> Option<String>;
}

/// Discovery against the real filesystem and loopback ports.
pub struct LocalDiscovery {
    usb: UsbScanner,
    probe: PortProbe,
    network: Arc<dyn NetworkIdentity>,
}

impl LocalDiscovery {
    /// Combine a volume scanner, a port probe and an address source.
    pub fn new(usb: UsbScanner, probe: PortProbe, network: Arc<dyn NetworkIdentity>) -> Self {
        Self {
            usb,
            probe,
            network,
        }
    }
}

impl DeviceDiscovery for LocalDiscovery {
    fn find_usb_device(&self) -> Option<DeviceInfo> {
        self.usb.find_device()
    }

    fn find_content_server_endpoint(&self, for_remote: bool) -> Option<String> {
        let port = self.probe.first_open_port()?;
        let host = if for_remote {
            self.network.local_address()
        } else {
            LOOPBACK.to_string()
        };
        Some(format!("http://{}:{}", host, port))
    }
}
