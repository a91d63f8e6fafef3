//! kobo-sync entry point.

use clap::Parser;
use kobo_sync::{
    DeliveryOrchestrator,
    calibre::{CalibreDb, CalibreTools},
    config::{Cli, Command, Config},
    formats::MetadataExtractor,
    library::{EbookCatalog, EbookRef, EbookScanner},
    network::{NetworkIdentity, OutboundAddress},
    server,
};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kobo_sync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Some(Command::Init { force }) => cmd_init(force),
        Some(Command::Scan { path }) => cmd_scan(path, &config),
        Some(Command::Import { path, index }) => cmd_import(path, index, &config).await,
        Some(Command::Send { path, index }) => cmd_send(path, index, &config).await,
        Some(Command::List { search }) => cmd_list(search, &config),
        Some(Command::Status) => cmd_status(&config).await,
        Some(Command::Serve { bind }) => cmd_serve(config, bind).await,
        None => cmd_serve(config, None).await,
    }
}

/// Write a default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());
    println!("\nEdit config.toml to point at your Calibre install and ebook folder.");
    println!("Then run: kobo-sync scan");

    Ok(())
}

/// Scan the given folder, or the configured default.
fn scan_folder(path: Option<PathBuf>, config: &Config) -> EbookCatalog {
    let folder = path
        .map(|p| kobo_sync::config::expand_home(&p))
        .unwrap_or_else(|| config.scan.default_folder());
    let ebooks = EbookScanner::new().scan(&folder);
    EbookCatalog::new(folder, ebooks)
}

/// Pick books by index, or all of them when no index was given.
fn select(catalog: &EbookCatalog, indices: &[usize]) -> Vec<EbookRef> {
    if indices.is_empty() {
        catalog.ebooks().to_vec()
    } else {
        catalog.select(indices)
    }
}

/// Print the books found in a folder.
fn cmd_scan(path: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let catalog = scan_folder(path, config);

    if catalog.is_empty() {
        println!("No ebooks found in {}", catalog.folder().display());
        return Ok(());
    }

    let extractor = MetadataExtractor;
    println!("{:<5} {:<40} {:<25} FORMAT", "#", "TITLE", "AUTHOR");
    println!("{}", "-".repeat(80));
    for (i, ebook) in catalog.ebooks().iter().enumerate() {
        let metadata = extractor.extract(ebook);
        println!(
            "{:<5} {:<40} {:<25} {}",
            i,
            metadata.display_title(ebook),
            metadata.display_author(),
            ebook.format_label()
        );
    }

    Ok(())
}

/// Import books into Calibre.
async fn cmd_import(path: Option<PathBuf>, index: Vec<usize>, config: &Config) -> anyhow::Result<()> {
    let catalog = scan_folder(path, config);
    let selected = select(&catalog, &index);
    let orchestrator = DeliveryOrchestrator::from_config(config);

    let report =
        tokio::task::spawn_blocking(move || orchestrator.import(&selected)).await?;

    println!(
        "Imported: {}  Already present: {}  Failed: {}",
        report.imported_count(),
        report.skipped_count(),
        report.failed_count()
    );
    if !report.ids().is_empty() {
        println!("Book ids: {:?}", report.ids());
    }

    Ok(())
}

/// Import books and deliver them to the Kobo.
async fn cmd_send(path: Option<PathBuf>, index: Vec<usize>, config: &Config) -> anyhow::Result<()> {
    let catalog = scan_folder(path, config);
    let selected = select(&catalog, &index);
    let orchestrator = DeliveryOrchestrator::from_config(config);

    let outcome =
        tokio::task::spawn_blocking(move || orchestrator.deliver(&selected)).await?;

    println!("{}", outcome.message);
    if !outcome.feed_url.is_empty() {
        println!("Feed: {}", outcome.feed_url);
    }

    Ok(())
}

/// List books in the Calibre library.
fn cmd_list(search: Option<String>, config: &Config) -> anyhow::Result<()> {
    let tools = CalibreTools::from_config(&config.calibre);
    let calibredb = CalibreDb::new(tools.calibredb, config.calibre.library_path.clone());

    print!("{}", calibredb.list(search.as_deref())?);

    Ok(())
}

/// Print Kobo connection status.
async fn cmd_status(config: &Config) -> anyhow::Result<()> {
    let orchestrator = DeliveryOrchestrator::from_config(config);
    let status = tokio::task::spawn_blocking(move || orchestrator.status()).await?;

    match status.device_name {
        Some(name) => println!("Kobo connected over USB: {}", name),
        None => println!("No Kobo connected over USB"),
    }
    if status.feed_url.is_empty() {
        println!("No content server running");
    } else {
        println!("Content server feed: {}", status.feed_url);
    }
    println!("Local address: {}", status.local_address);

    Ok(())
}

/// Start the web interface.
async fn cmd_serve(mut config: Config, bind: Option<std::net::SocketAddr>) -> anyhow::Result<()> {
    // Override bind address if specified
    if let Some(addr) = bind {
        config.server.bind = addr;
    }

    let port = config.server.bind.port();
    let local_ip = OutboundAddress::new(config.network.probe_target.clone()).local_address();

    tracing::info!(
        bind = %config.server.bind,
        kobo_url = %format!("http://{}:{}/kobo", local_ip, port),
        "Starting kobo-sync"
    );

    let state = server::AppState::new(config.clone());
    let app = server::create_router(state);

    let listener = TcpListener::bind(config.server.bind).await?;
    println!("  Computer: http://127.0.0.1:{}", port);
    println!("  Kobo:     http://{}:{}/kobo", local_ip, port);

    axum::serve(listener, app).await?;

    Ok(())
}
