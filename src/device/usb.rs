use crate::device::DeviceInfo;
use crate::library::EbookRef;
use serde::Serialize;
use std::path::PathBuf;

/// Looks for a reader among mounted removable volumes.
#[derive(Debug, Clone)]
pub struct UsbScanner {
    volumes_root: PathBuf,
    marker_dir: String,
}

impl UsbScanner {
    /// Scan the children of `volumes_root` for a `marker_dir` directory.
    pub fn new(volumes_root: impl Into<PathBuf>, marker_dir: impl Into<String>) -> Self {
        Self {
            volumes_root: volumes_root.into(),
            marker_dir: marker_dir.into(),
        }
    }

    /// First volume carrying the marker, in directory listing order.
    pub fn find_device(&self) -> Option<DeviceInfo> {
        let entries = match std::fs::read_dir(&self.volumes_root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(root = %self.volumes_root.display(), error = %e, "No volumes root");
                return None;
            }
        };

        let device = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .find(|p| p.join(&self.marker_dir).is_dir())
            .map(|mount_path| DeviceInfo {
                name: mount_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                mount_path,
                connected: true,
            });

        if let Some(ref d) = device {
            tracing::info!(name = %d.name, mount = %d.mount_path.display(), "Kobo detected over USB");
        }
        device
    }
}

/// Result of copying files onto a device.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    /// Files copied.
    pub sent: usize,
    /// Files that could not be copied, with the reason.
    pub failed: Vec<(EbookRef, String)>,
}

/// Copy each ebook to the device root under its original file name.
///
/// A failed copy is logged and skipped.
pub fn copy_to_device(ebooks: &[EbookRef], device: &DeviceInfo) -> CopyReport {
    let mut report = CopyReport::default();

    for ebook in ebooks {
        let Some(name) = ebook.path.file_name() else {
            tracing::warn!(path = %ebook.path.display(), "No file name, not copied");
            report
                .failed
                .push((ebook.clone(), "path has no file name".to_string()));
            continue;
        };

        let dest = device.mount_path.join(name);
        match std::fs::copy(&ebook.path, &dest) {
            Ok(bytes) => {
                tracing::debug!(src = %ebook.path.display(), dest = %dest.display(), bytes = bytes, "Copied to device");
                report.sent += 1;
            }
            Err(e) => {
                tracing::warn!(path = %ebook.path.display(), error = %e, "Copy to device failed");
                report.failed.push((ebook.clone(), e.to_string()));
            }
        }
    }

    report
}
