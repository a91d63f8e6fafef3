//! Calibre command-line integration.

mod importer;
mod server;
mod tools;

pub use importer::{CalibreDb, ImportReport, ImportStatus, LibraryImporter, parse_added_ids};
pub use server::{CalibreServer, ContentServerLauncher, DetachedServer};
pub use tools::{CalibreTools, find_library_path};
