use crate::config::{CalibreConfig, expand_home};
use std::path::{Path, PathBuf};

/// Locations of the Calibre executables this crate drives.
#[derive(Debug, Clone, Default)]
pub struct CalibreTools {
    /// `calibredb`, if found.
    pub calibredb: Option<PathBuf>,
    /// `calibre-server`, if found.
    pub calibre_server: Option<PathBuf>,
}

impl CalibreTools {
    /// Resolve tools from config: explicit paths, then the app directory, then `PATH`.
    pub fn from_config(config: &CalibreConfig) -> Self {
        let tools = Self {
            calibredb: config
                .calibredb
                .as_deref()
                .map(expand_home)
                .or_else(|| locate("calibredb", &config.app_dir)),
            calibre_server: config
                .calibre_server
                .as_deref()
                .map(expand_home)
                .or_else(|| locate("calibre-server", &config.app_dir)),
        };

        tracing::debug!(
            calibredb = ?tools.calibredb,
            calibre_server = ?tools.calibre_server,
            "Resolved Calibre tools"
        );
        tools
    }
}

/// Find an executable in `app_dir`, then on `PATH`.
fn locate(name: &str, app_dir: &Path) -> Option<PathBuf> {
    let bundled = app_dir.join(name);
    if bundled.is_file() {
        return Some(bundled);
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Find the Calibre library directory.
///
/// A configured path is used as-is when it exists; otherwise the usual
/// locations under the home directory are tried in order.
pub fn find_library_path(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        let path = expand_home(path);
        return path.is_dir().then_some(path);
    }

    let home = dirs::home_dir()?;
    [
        home.join("Calibre Library"),
        home.join("Documents").join("Calibre Library"),
        home.join("Library").join("Calibre Library"),
    ]
    .into_iter()
    .find(|p| p.is_dir())
}
