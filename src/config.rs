use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Import ebooks into Calibre and deliver them to a Kobo reader.
#[derive(Parser, Debug, Clone)]
#[command(name = "kobo-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "KOBO_SYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the web interface (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// List the ebooks found in a folder.
    Scan {
        /// Folder to scan (defaults to the configured source folder).
        path: Option<PathBuf>,
    },

    /// Import ebooks from a folder into the Calibre library.
    Import {
        /// Folder to scan (defaults to the configured source folder).
        path: Option<PathBuf>,
        /// Indices of the books to import, as printed by `scan` (all if omitted).
        #[arg(short, long)]
        index: Vec<usize>,
    },

    /// Import ebooks and deliver them to the Kobo.
    Send {
        /// Folder to scan (defaults to the configured source folder).
        path: Option<PathBuf>,
        /// Indices of the books to send, as printed by `scan` (all if omitted).
        #[arg(short, long)]
        index: Vec<usize>,
    },

    /// List books already in the Calibre library.
    List {
        /// Calibre search expression.
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show Kobo connection status.
    Status,

    /// Create a default config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Web interface configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Source folder configuration.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Calibre tools configuration.
    #[serde(default)]
    pub calibre: CalibreConfig,

    /// Reader device detection.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Network discovery configuration.
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Web interface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Page title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Number of scan results kept in memory before the oldest is dropped.
    #[serde(default = "default_max_catalogs")]
    pub max_catalogs: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            title: default_title(),
            max_catalogs: default_max_catalogs(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        5050,
    )
}

fn default_title() -> String {
    "Kobo Calibre Sync".to_string()
}

fn default_max_catalogs() -> usize {
    16
}

/// Source folder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Folder scanned when none is given. Falls back to `EBOOK_SOURCE_DIR`,
    /// then `~/Downloads`.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
}

impl ScanConfig {
    /// Resolve the folder to scan when the caller did not name one.
    pub fn default_folder(&self) -> PathBuf {
        if let Some(ref dir) = self.source_dir {
            return expand_home(dir);
        }
        if let Some(dir) = std::env::var_os("EBOOK_SOURCE_DIR") {
            return PathBuf::from(dir);
        }
        dirs::home_dir()
            .map(|home| home.join("Downloads"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &std::path::Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Calibre tools configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibreConfig {
    /// Directory searched for Calibre tools before `PATH`.
    #[serde(default = "default_app_dir")]
    pub app_dir: PathBuf,

    /// Explicit path to `calibredb`.
    #[serde(default)]
    pub calibredb: Option<PathBuf>,

    /// Explicit path to `calibre-server`.
    #[serde(default)]
    pub calibre_server: Option<PathBuf>,

    /// Calibre library to use instead of the auto-detected one.
    #[serde(default)]
    pub library_path: Option<PathBuf>,

    /// Port used when the content server has to be started.
    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

impl Default for CalibreConfig {
    fn default() -> Self {
        Self {
            app_dir: default_app_dir(),
            calibredb: None,
            calibre_server: None,
            library_path: None,
            server_port: default_server_port(),
        }
    }
}

fn default_app_dir() -> PathBuf {
    PathBuf::from("/Applications/calibre.app/Contents/MacOS")
}

fn default_server_port() -> u16 {
    8080
}

/// Reader device detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Directory whose children are the mounted removable volumes.
    #[serde(default = "default_volumes_root")]
    pub volumes_root: PathBuf,

    /// Directory name marking a volume as a Kobo.
    #[serde(default = "default_marker_dir")]
    pub marker_dir: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            volumes_root: default_volumes_root(),
            marker_dir: default_marker_dir(),
        }
    }
}

fn default_volumes_root() -> PathBuf {
    PathBuf::from("/Volumes")
}

fn default_marker_dir() -> String {
    ".kobo".to_string()
}

/// Network discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// External address used to find the outbound interface. Nothing is sent.
    #[serde(default = "default_probe_target")]
    pub probe_target: String,

    /// Ports probed on loopback for a running content server, in order.
    #[serde(default = "default_probe_ports")]
    pub probe_ports: Vec<u16>,

    /// Connect timeout per probed port, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Path appended to the content server URL.
    #[serde(default = "default_feed_path")]
    pub feed_path: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_target: default_probe_target(),
            probe_ports: default_probe_ports(),
            probe_timeout_ms: default_probe_timeout_ms(),
            feed_path: default_feed_path(),
        }
    }
}

impl NetworkConfig {
    /// Per-port connect timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn default_probe_target() -> String {
    "8.8.8.8:80".to_string()
}

fn default_probe_ports() -> Vec<u16> {
    vec![8080, 8180, 8081]
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_feed_path() -> String {
    "/opds".to_string()
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("kobo-sync.toml"),
            dirs::config_dir()
                .map(|p| p.join("kobo-sync").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/kobo-sync/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# kobo-sync configuration

[server]
bind = "0.0.0.0:5050"
title = "Kobo Calibre Sync"
max_catalogs = 16

[scan]
# Defaults to $EBOOK_SOURCE_DIR, then ~/Downloads
# source_dir = "~/Downloads"

[calibre]
app_dir = "/Applications/calibre.app/Contents/MacOS"
# calibredb = "/usr/bin/calibredb"
# calibre_server = "/usr/bin/calibre-server"
# library_path = "~/Calibre Library"
server_port = 8080

[device]
volumes_root = "/Volumes"
marker_dir = ".kobo"

[network]
probe_target = "8.8.8.8:80"
probe_ports = [8080, 8180, 8081]
probe_timeout_ms = 1000
feed_path = "/opds"
"#
        .to_string()
    }
}

/// Supported book formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    /// EPUB format (Electronic Publication).
    Epub,
    /// MOBI format (Mobipocket, including Kindle AZW/AZW3).
    Mobi,
    /// FB2 format (FictionBook).
    Fb2,
    /// CBZ format (Comic Book ZIP archive).
    Cbz,
    /// CBR format (Comic Book RAR archive).
    Cbr,
}

impl BookFormat {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            BookFormat::Epub => "application/epub+zip",
            BookFormat::Mobi => "application/x-mobipocket-ebook",
            BookFormat::Fb2 => "application/x-fictionbook+xml",
            BookFormat::Cbz => "application/vnd.comicbook+zip",
            BookFormat::Cbr => "application/vnd.comicbook-rar",
        }
    }

    /// Try to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "epub" => Some(BookFormat::Epub),
            "mobi" | "azw" | "azw3" => Some(BookFormat::Mobi),
            "fb2" => Some(BookFormat::Fb2),
            "cbz" => Some(BookFormat::Cbz),
            "cbr" => Some(BookFormat::Cbr),
            _ => None,
        }
    }

    /// Detect format from a file path.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}
