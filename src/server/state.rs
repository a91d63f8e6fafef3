//! Application state shared across handlers.

use crate::config::Config;
use crate::delivery::DeliveryOrchestrator;
use crate::formats::MetadataExtractor;
use crate::library::{EbookCatalog, EbookScanner};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Delivery engine.
    pub orchestrator: Arc<DeliveryOrchestrator>,
    /// Metadata reader for scanned books.
    pub extractor: MetadataExtractor,
    scanner: EbookScanner,
    /// Scan results, oldest first.
    catalogs: Arc<parking_lot::RwLock<VecDeque<Arc<EbookCatalog>>>>,
}

impl AppState {
    /// Create state backed by the Calibre tools named in `config`.
    pub fn new(config: Config) -> Self {
        let orchestrator = DeliveryOrchestrator::from_config(&config);
        Self::with_orchestrator(config, orchestrator)
    }

    /// Create state around an existing orchestrator.
    pub fn with_orchestrator(config: Config, orchestrator: DeliveryOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            extractor: MetadataExtractor,
            scanner: EbookScanner::new(),
            catalogs: Arc::new(parking_lot::RwLock::new(VecDeque::new())),
        }
    }

    /// Scan a folder and keep the result as a new catalog.
    pub fn scan(&self, folder: &Path) -> Arc<EbookCatalog> {
        let catalog = Arc::new(EbookCatalog::new(folder, self.scanner.scan(folder)));

        let mut catalogs = self.catalogs.write();
        catalogs.push_back(catalog.clone());

        let limit = self.config.server.max_catalogs.max(1);
        while catalogs.len() > limit {
            if let Some(oldest) = catalogs.pop_front() {
                tracing::debug!(catalog = %oldest.id(), "Dropped old scan results");
            }
        }

        catalog
    }

    /// Get a catalog by id.
    pub fn catalog(&self, id: &Uuid) -> Option<Arc<EbookCatalog>> {
        self.catalogs
            .read()
            .iter()
            .find(|c| c.id() == *id)
            .cloned()
    }

    /// Every catalog held, newest first.
    pub fn catalogs(&self) -> Vec<Arc<EbookCatalog>> {
        self.catalogs.read().iter().rev().cloned().collect()
    }

    /// Number of catalogs held.
    pub fn catalog_count(&self) -> usize {
        self.catalogs.read().len()
    }
}
