//! Folder scanner for ebook files.

use crate::config::BookFormat;
use crate::library::book::EbookRef;
use std::path::Path;

/// Lists the ebook files directly inside a folder.
#[derive(Debug, Clone, Default)]
pub struct EbookScanner;

impl EbookScanner {
    /// Create a scanner accepting every supported format.
    pub fn new() -> Self {
        Self
    }

    /// Scan a folder (non-recursive), sorted case-insensitively by file name.
    ///
    /// A missing folder yields an empty list.
    pub fn scan(&self, folder: &Path) -> Vec<EbookRef> {
        if !folder.is_dir() {
            tracing::debug!(folder = %folder.display(), "Scan folder does not exist");
            return Vec::new();
        }

        let mut ebooks: Vec<EbookRef> = walkdir::WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| BookFormat::from_path(e.path()).is_some())
            .map(|e| EbookRef::new(e.into_path()))
            .collect();

        ebooks.sort_by_key(|e| e.filename().to_lowercase());

        tracing::info!(folder = %folder.display(), found = ebooks.len(), "Scanned folder");
        ebooks
    }
}
