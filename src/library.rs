//! Ebook references, scanning and scan results.

pub mod book;
pub mod catalog;
pub mod scanner;

pub use book::{BookMetadata, EbookRef};
pub use catalog::EbookCatalog;
pub use scanner::EbookScanner;
