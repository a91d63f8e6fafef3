//! Delivery of selected ebooks to the Kobo.
//!
//! Books are first imported into Calibre, then delivered by the first strategy
//! that works:
//!
//! 1. copy over USB when a Kobo volume is mounted;
//! 2. point the reader at a content server that is already listening;
//! 3. start a content server and point the reader at it.
//!
//! When all of these fail the outcome carries instructions instead of a URL.
//! No collaborator error ever escapes [`DeliveryOrchestrator::deliver`].

use crate::calibre::{
    CalibreDb, CalibreServer, CalibreTools, ContentServerLauncher, ImportReport, LibraryImporter,
};
use crate::config::Config;
use crate::device::{DeviceDiscovery, LocalDiscovery, PortProbe, UsbScanner, copy_to_device};
use crate::library::EbookRef;
use crate::network::{NetworkIdentity, OutboundAddress};
use serde::Serialize;
use std::sync::Arc;

/// Instructions shown when no network delivery is possible.
const WIRELESS_INSTRUCTIONS: &str = "Books imported into Calibre. To sync, open Calibre > \
     Connect/share > Start wireless device connection";

/// Which branch produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStrategy {
    /// Files were copied to a mounted reader.
    Usb,
    /// A content server was already listening.
    ExistingServer,
    /// A content server was started for this delivery.
    StartedServer,
    /// Nothing reachable; the message explains what to do.
    Instructions,
}

/// Result of one delivery.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    /// Books the library reported new ids for.
    pub imported_count: usize,
    /// Books the library already had.
    pub import_skipped: usize,
    /// Books the library tool failed on.
    pub import_failed: usize,
    /// Files copied to the reader.
    pub sent_over_usb_count: usize,
    /// Files that failed to copy to the reader.
    pub usb_failed: usize,
    /// Whether a reader volume was found.
    pub device_connected: bool,
    /// Name of the reader volume, if found.
    pub device_name: Option<String>,
    /// Feed URL to open on the reader, empty when none.
    pub feed_url: String,
    /// LAN address of this machine.
    pub local_network_address: String,
    /// Branch taken.
    pub strategy: DeliveryStrategy,
    /// Human-readable summary.
    pub message: String,
}

/// Connection status as shown by the UI.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    /// Whether a reader volume is mounted.
    pub usb_connected: bool,
    /// Reader volume name.
    pub device_name: Option<String>,
    /// Feed URL of a running content server, empty when none.
    pub feed_url: String,
    /// LAN address of this machine.
    pub local_address: String,
    /// URL of this application's own pages, as seen from the LAN.
    pub app_url: String,
    /// Short URL of the reader page, to type into the Kobo browser.
    pub kobo_url: String,
}

/// Decides how to get books onto the reader.
pub struct DeliveryOrchestrator {
    importer: Arc<dyn LibraryImporter>,
    discovery: Arc<dyn DeviceDiscovery>,
    launcher: Arc<dyn ContentServerLauncher>,
    network: Arc<dyn NetworkIdentity>,
    server_port: u16,
    feed_path: String,
    app_port: u16,
}

impl DeliveryOrchestrator {
    /// Assemble an orchestrator from explicit collaborators.
    pub fn new(
        importer: Arc<dyn LibraryImporter>,
        discovery: Arc<dyn DeviceDiscovery>,
        launcher: Arc<dyn ContentServerLauncher>,
        network: Arc<dyn NetworkIdentity>,
    ) -> Self {
        Self {
            importer,
            discovery,
            launcher,
            network,
            server_port: 8080,
            feed_path: "/opds".to_string(),
            app_port: 5050,
        }
    }

    /// Build the Calibre-backed orchestrator described by `config`.
    pub fn from_config(config: &Config) -> Self {
        let tools = CalibreTools::from_config(&config.calibre);
        let network: Arc<dyn NetworkIdentity> =
            Arc::new(OutboundAddress::new(config.network.probe_target.clone()));

        let discovery = LocalDiscovery::new(
            UsbScanner::new(
                config.device.volumes_root.clone(),
                config.device.marker_dir.clone(),
            ),
            PortProbe::new(
                config.network.probe_ports.clone(),
                config.network.probe_timeout(),
            ),
            network.clone(),
        );

        Self::new(
            Arc::new(CalibreDb::new(
                tools.calibredb,
                config.calibre.library_path.clone(),
            )),
            Arc::new(discovery),
            Arc::new(CalibreServer::new(
                tools.calibre_server,
                config.calibre.library_path.clone(),
            )),
            network,
        )
        .server_port(config.calibre.server_port)
        .feed_path(config.network.feed_path.clone())
        .app_port(config.server.bind.port())
    }

    /// Port used when a content server has to be started.
    pub fn server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    /// Path appended to content server URLs.
    pub fn feed_path(mut self, path: impl Into<String>) -> Self {
        self.feed_path = path.into();
        self
    }

    /// Port of this application's web interface.
    pub fn app_port(mut self, port: u16) -> Self {
        self.app_port = port;
        self
    }

    fn feed_url(&self, endpoint: &str) -> String {
        let path = self.feed_path.trim_start_matches('/');
        format!("{}/{}", endpoint.trim_end_matches('/'), path)
    }

    /// Base URL of this application as seen from the LAN.
    pub fn app_url(&self) -> String {
        Self::app_url_at(&self.network.local_address(), self.app_port)
    }

    fn app_url_at(address: &str, port: u16) -> String {
        format!("http://{}:{}", address, port)
    }

    /// Import into the library without delivering.
    pub fn import(&self, selected: &[EbookRef]) -> ImportReport {
        self.importer.import(selected)
    }

    /// Import `selected` and deliver it to the reader.
    pub fn deliver(&self, selected: &[EbookRef]) -> DeliveryOutcome {
        tracing::info!(books = selected.len(), "Starting delivery");

        let report = self.importer.import(selected);
        let local_network_address = self.network.local_address();

        let outcome = |strategy, feed_url: String, message: String| DeliveryOutcome {
            imported_count: report.imported_count(),
            import_skipped: report.skipped_count(),
            import_failed: report.failed_count(),
            sent_over_usb_count: 0,
            usb_failed: 0,
            device_connected: false,
            device_name: None,
            feed_url,
            local_network_address: local_network_address.clone(),
            strategy,
            message,
        };

        if let Some(device) = self.discovery.find_usb_device() {
            let copied = copy_to_device(selected, &device);
            let mut message = format!(
                "Sent {} ebook(s) to Kobo ({}) via USB",
                copied.sent, device.name
            );
            if !copied.failed.is_empty() {
                message.push_str(&format!(", {} failed to copy", copied.failed.len()));
            }

            let result = DeliveryOutcome {
                sent_over_usb_count: copied.sent,
                usb_failed: copied.failed.len(),
                device_connected: true,
                device_name: Some(device.name),
                ..outcome(DeliveryStrategy::Usb, String::new(), message)
            };
            tracing::info!(
                sent = result.sent_over_usb_count,
                failed = result.usb_failed,
                "Delivered over USB"
            );
            return result;
        }

        if let Some(endpoint) = self.discovery.find_content_server_endpoint(true) {
            let url = self.feed_url(&endpoint);
            tracing::info!(url = %url, "Using running content server");
            let message = format!(
                "Books imported into Calibre. Open this address in the Kobo browser: {}",
                url
            );
            return outcome(DeliveryStrategy::ExistingServer, url, message);
        }

        match self.launcher.start(self.server_port) {
            Ok(server) => {
                let endpoint = format!("http://{}:{}", local_network_address, server.port());
                let url = self.feed_url(&endpoint);
                let message = format!(
                    "Content server started. Open this address in the Kobo browser: {}",
                    url
                );
                outcome(DeliveryStrategy::StartedServer, url, message)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not start content server");
                let message = format!("{} ({})", WIRELESS_INSTRUCTIONS, e);
                outcome(DeliveryStrategy::Instructions, String::new(), message)
            }
        }
    }

    /// Current reader and content server status. Imports and starts nothing.
    pub fn status(&self) -> DeviceStatus {
        let device = self.discovery.find_usb_device();
        let local_address = self.network.local_address();
        let feed_url = self
            .discovery
            .find_content_server_endpoint(true)
            .map(|endpoint| self.feed_url(&endpoint))
            .unwrap_or_default();

        let app_url = Self::app_url_at(&local_address, self.app_port);

        DeviceStatus {
            usb_connected: device.is_some(),
            device_name: device.map(|d| d.name),
            feed_url,
            kobo_url: format!("{}/kobo", app_url),
            app_url,
            local_address,
        }
    }
}
