mod epub;

pub use epub::EpubHandler;

use crate::config::BookFormat;
use crate::error::Result;
use crate::library::{BookMetadata, EbookRef};
use std::path::Path;

/// Trait for format-specific metadata readers.
pub trait FormatHandler: Send + Sync {
    /// Extract metadata from a book file.
    fn extract_metadata(&self, path: &Path) -> Result<BookMetadata>;
}

/// Get the appropriate handler for a book format.
pub fn get_handler(format: BookFormat) -> Box<dyn FormatHandler> {
    match format {
        BookFormat::Epub => Box::new(EpubHandler),
        // Other formats are shown by file name only
        _ => Box::new(MinimalHandler),
    }
}

/// Handler for formats without metadata support.
struct MinimalHandler;

impl FormatHandler for MinimalHandler {
    fn extract_metadata(&self, _path: &Path) -> Result<BookMetadata> {
        Ok(BookMetadata::default())
    }
}

/// Reads metadata for scanned ebooks, never failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract metadata, returning empty metadata for unreadable files.
    pub fn extract(&self, ebook: &EbookRef) -> BookMetadata {
        let Some(format) = ebook.format() else {
            return BookMetadata::default();
        };

        match get_handler(format).extract_metadata(&ebook.path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!(path = %ebook.path.display(), error = %e, "Failed to extract metadata");
                BookMetadata::default()
            }
        }
    }
}
