//! Ebook file reference and metadata model.

use crate::config::BookFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A discovered ebook file. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EbookRef {
    /// Path to the ebook file.
    pub path: PathBuf,
}

impl EbookRef {
    /// Create a reference to an ebook file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the filename of the book.
    pub fn filename(&self) -> &str {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
    }

    /// File name without extension, used when no title is known.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
    }

    /// Upper-case extension shown as the format badge (e.g. "EPUB", "AZW3").
    pub fn format_label(&self) -> String {
        self.path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_uppercase()
    }

    /// Detected book format.
    pub fn format(&self) -> Option<BookFormat> {
        BookFormat::from_path(&self.path)
    }
}

/// Metadata extracted from an ebook. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    /// Book title.
    pub title: Option<String>,

    /// First listed author.
    pub author: Option<String>,

    /// Language code (e.g., "en", "it").
    pub language: Option<String>,

    /// Publisher name.
    pub publisher: Option<String>,

    /// Book description or summary.
    pub description: Option<String>,

    /// ISBN, when an identifier is marked as one.
    pub isbn: Option<String>,
}

impl BookMetadata {
    /// Title to display, falling back to the file stem.
    pub fn display_title(&self, ebook: &EbookRef) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| ebook.stem().to_string())
    }

    /// Author to display.
    pub fn display_author(&self) -> String {
        self.author
            .clone()
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
