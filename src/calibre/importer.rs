//! Adding books to the Calibre library through `calibredb`.

use crate::error::{AppError, Result};
use crate::library::EbookRef;
use serde::Serialize;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// Marker printed by `calibredb add` before the new ids.
const ADDED_IDS_PREFIX: &str = "Added book ids:";

/// Something that can put ebooks into a library.
pub trait LibraryImporter: Send + Sync {
    /// Import every ebook, one at a time. Never fails as a whole.
    fn import(&self, ebooks: &[EbookRef]) -> ImportReport;
}

/// What happened to one imported file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ImportStatus {
    /// Added; ids reported by the tool (possibly none if the output was unreadable).
    Added(Vec<u32>),
    /// The library already holds this book.
    AlreadyExists,
    /// The tool failed for this file.
    Failed(String),
}

/// Per-file import tally.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    items: Vec<(EbookRef, ImportStatus)>,
}

impl ImportReport {
    /// Record the outcome for one file.
    pub fn push(&mut self, ebook: EbookRef, status: ImportStatus) {
        self.items.push((ebook, status));
    }

    /// Per-file outcomes, in import order.
    pub fn items(&self) -> &[(EbookRef, ImportStatus)] {
        &self.items
    }

    /// Every id the library assigned, in report order.
    pub fn ids(&self) -> Vec<u32> {
        self.items
            .iter()
            .filter_map(|(_, status)| match status {
                ImportStatus::Added(ids) => Some(ids.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Files for which the library reported at least one new id.
    pub fn imported_count(&self) -> usize {
        self.count(|s| matches!(s, ImportStatus::Added(ids) if !ids.is_empty()))
    }

    /// Files skipped because they were already in the library.
    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, ImportStatus::AlreadyExists))
    }

    /// Files the tool failed on.
    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, ImportStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ImportStatus) -> bool) -> usize {
        self.items.iter().filter(|(_, s)| pred(s)).count()
    }
}

/// Parse the ids from `calibredb add` output.
///
/// Accepts lines of the form `Added book ids: <int> ("," <int>)*`. Ids that do
/// not parse are dropped individually; output without such a line yields
/// nothing.
pub fn parse_added_ids(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| {
            let start = line.find(ADDED_IDS_PREFIX)?;
            Some(&line[start + ADDED_IDS_PREFIX.len()..])
        })
        .flat_map(|ids| ids.split(','))
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}

fn mentions_already_exists(text: &str) -> bool {
    text.to_lowercase().contains("already exist")
}

/// `calibredb` wrapper.
#[derive(Debug, Clone)]
pub struct CalibreDb {
    program: Option<PathBuf>,
    library: Option<PathBuf>,
}

impl CalibreDb {
    /// Wrap a `calibredb` executable. `library` adds `--with-library` to every call.
    pub fn new(program: Option<PathBuf>, library: Option<PathBuf>) -> Self {
        Self { program, library }
    }

    /// Run `calibredb` with the given arguments.
    ///
    /// A nonzero exit is an error unless stderr says the book already exists.
    fn run<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| AppError::ToolNotFound("calibredb".into()))?;

        let mut cmd = Command::new(program);
        if let Some(ref library) = self.library {
            cmd.arg("--with-library").arg(library);
        }
        let output = cmd
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| AppError::ExternalTool {
                tool: "calibredb".into(),
                message: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() && !mentions_already_exists(&stderr) {
            return Err(AppError::ExternalTool {
                tool: "calibredb".into(),
                message: stderr.trim().to_string(),
            });
        }

        Ok(output)
    }

    /// Add a single file.
    pub fn add(&self, ebook: &EbookRef) -> ImportStatus {
        let output = match self.run([OsStr::new("add"), ebook.path.as_os_str()]) {
            Ok(output) => output,
            Err(e) => return ImportStatus::Failed(e.to_string()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let ids = parse_added_ids(&stdout);

        if !output.status.success()
            || (ids.is_empty() && (mentions_already_exists(&stdout) || mentions_already_exists(&stderr)))
        {
            return ImportStatus::AlreadyExists;
        }

        if ids.is_empty() {
            tracing::debug!(path = %ebook.path.display(), "calibredb reported no book ids");
        }
        ImportStatus::Added(ids)
    }

    /// List books in the library, optionally filtered by a search expression.
    pub fn list(&self, search: Option<&str>) -> Result<String> {
        let output = match search.filter(|s| !s.is_empty()) {
            Some(term) => self.run(["list", "--search", term])?,
            None => self.run(["list"])?,
        };
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl LibraryImporter for CalibreDb {
    fn import(&self, ebooks: &[EbookRef]) -> ImportReport {
        let mut report = ImportReport::default();

        for ebook in ebooks {
            let status = self.add(ebook);
            match &status {
                ImportStatus::Added(ids) => {
                    tracing::info!(path = %ebook.path.display(), ids = ?ids, "Imported into Calibre")
                }
                ImportStatus::AlreadyExists => {
                    tracing::info!(path = %ebook.path.display(), "Already in Calibre library")
                }
                ImportStatus::Failed(reason) => {
                    tracing::warn!(path = %ebook.path.display(), error = %reason, "Import failed, skipping")
                }
            }
            report.push(ebook.clone(), status);
        }

        report
    }
}
