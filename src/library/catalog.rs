//! Results of a single folder scan.

use crate::library::book::EbookRef;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Ebooks found by one scan, addressed by position.
///
/// Each scan produces a new catalog with its own id, so concurrent users of
/// the web interface never see each other's selections.
#[derive(Debug, Clone)]
pub struct EbookCatalog {
    id: Uuid,
    folder: PathBuf,
    ebooks: Vec<EbookRef>,
    created: DateTime<Utc>,
}

impl EbookCatalog {
    /// Create a catalog from scan results.
    pub fn new(folder: impl Into<PathBuf>, ebooks: Vec<EbookRef>) -> Self {
        Self {
            id: Uuid::new_v4(),
            folder: folder.into(),
            ebooks,
            created: Utc::now(),
        }
    }

    /// Catalog identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Folder that was scanned.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// When the scan ran.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// All ebooks, in scan order.
    pub fn ebooks(&self) -> &[EbookRef] {
        &self.ebooks
    }

    /// Ebook at a position.
    pub fn get(&self, index: usize) -> Option<&EbookRef> {
        self.ebooks.get(index)
    }

    /// Ebooks at the given positions. Out-of-range indices are ignored.
    pub fn select(&self, indices: &[usize]) -> Vec<EbookRef> {
        indices
            .iter()
            .filter_map(|&i| self.ebooks.get(i).cloned())
            .collect()
    }

    /// Number of ebooks.
    pub fn len(&self) -> usize {
        self.ebooks.len()
    }

    /// Whether the scan found nothing.
    pub fn is_empty(&self) -> bool {
        self.ebooks.is_empty()
    }
}
