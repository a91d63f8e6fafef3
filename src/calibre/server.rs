//! Starting the Calibre content server.

use crate::calibre::tools::find_library_path;
use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Something that can start a content server on a port.
pub trait ContentServerLauncher: Send + Sync {
    /// Start a server listening on all interfaces.
    fn start(&self, port: u16) -> Result<DetachedServer>;
}

/// A server process that was spawned and left running.
///
/// The process is never waited on, supervised or stopped by this crate;
/// only its pid and port are kept for reporting. Since nothing reaps it, a
/// server that exits while we are still running stays a zombie on Unix until
/// this process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetachedServer {
    pid: u32,
    port: u16,
}

impl DetachedServer {
    /// Let go of a freshly spawned child.
    pub fn detach(child: Child, port: u16) -> Self {
        let pid = child.id();
        // Dropping a Child neither kills nor waits for it
        drop(child);
        Self { pid, port }
    }

    /// Process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Port the server was told to listen on.
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// `calibre-server` launcher.
#[derive(Debug, Clone)]
pub struct CalibreServer {
    program: Option<PathBuf>,
    library: Option<PathBuf>,
}

impl CalibreServer {
    /// Wrap a `calibre-server` executable. `library` overrides library detection.
    pub fn new(program: Option<PathBuf>, library: Option<PathBuf>) -> Self {
        Self { program, library }
    }
}

impl ContentServerLauncher for CalibreServer {
    fn start(&self, port: u16) -> Result<DetachedServer> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| AppError::ToolNotFound("calibre-server".into()))?;

        let library = find_library_path(self.library.as_deref()).ok_or(AppError::LibraryNotFound)?;

        let child = Command::new(program)
            .arg(&library)
            .args(["--port", &port.to_string(), "--listen-on", "0.0.0.0"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AppError::ServerStart(e.to_string()))?;

        let server = DetachedServer::detach(child, port);
        tracing::info!(
            pid = server.pid(),
            port = port,
            library = %library.display(),
            "Started Calibre content server"
        );
        Ok(server)
    }
}
