//! kobo-sync: import ebooks into Calibre and deliver them to a Kobo reader.
//!
//! Books found in a folder are added to the Calibre library with `calibredb`,
//! then delivered to the reader over USB when a Kobo volume is mounted, or
//! through a Calibre content server the reader's browser can reach.
//!
//! # Features
//!
//! - Folder scanning with EPUB metadata extraction
//! - Best-effort Calibre import with per-file results
//! - USB delivery to a mounted Kobo
//! - Discovery or auto-start of the Calibre content server
//! - Web interface with a download page for the Kobo browser

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Calibre command-line integration.
pub mod calibre;
/// Configuration and CLI.
pub mod config;
/// Delivery orchestration.
pub mod delivery;
/// Reader device and content server detection.
pub mod device;
/// Error types.
pub mod error;
/// Book format handlers.
pub mod formats;
/// Ebook references and scanning.
pub mod library;
/// LAN address discovery.
pub mod network;
/// HTTP server.
pub mod server;


pub use config::{Cli, Command, Config};
pub use delivery::{DeliveryOrchestrator, DeliveryOutcome};
pub use error::{AppError, Result};
pub use server::AppState;
