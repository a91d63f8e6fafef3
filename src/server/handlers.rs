//! HTTP request handlers.

use crate::config::expand_home;
use crate::delivery::{DeliveryOutcome, DeviceStatus};
use crate::error::{AppError, Result};
use crate::library::{EbookCatalog, EbookRef};
use crate::server::AppState;
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, Response},
};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Run blocking core work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn find_catalog(state: &AppState, id: &Uuid) -> Result<Arc<EbookCatalog>> {
    state
        .catalog(id)
        .ok_or_else(|| AppError::NotFound(format!("Scan results not found: {}", id)))
}

/// Full LAN URL of a catalog's reader page. Resolves the local address.
fn kobo_url(state: &AppState, id: Uuid) -> String {
    format!("{}/kobo/{}", state.orchestrator.app_url(), id)
}

// ============================================================================
// WEB PAGES
// ============================================================================

/// Index page: scan, select and send.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let title = escape(state.config.server.title.as_str()).into_owned();
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; max-width: 900px; margin: 2rem auto; padding: 0 1rem; }}
        table {{ width: 100%; border-collapse: collapse; margin: 1rem 0; }}
        th, td {{ text-align: left; padding: 0.5rem; border-bottom: 1px solid #ddd; }}
        .format {{ background: #222; color: #fff; padding: 0.1rem 0.5rem; font-size: 0.8rem; }}
        #status {{ background: #f5f5f5; padding: 1rem; border-radius: 8px; }}
        button {{ padding: 0.5rem 1rem; margin-right: 0.5rem; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p>
        <input id="path" placeholder="Folder (default: Downloads)" size="40">
        <button onclick="scan()">Scan</button>
    </p>
    <table>
        <thead><tr><th></th><th>Title</th><th>Author</th><th>Format</th></tr></thead>
        <tbody id="books"><tr><td colspan="4">No scan yet.</td></tr></tbody>
    </table>
    <p>
        <button onclick="act('/api/import')">Import into Calibre</button>
        <button onclick="act('/api/send')">Send to Kobo</button>
    </p>
    <div id="status">Checking Kobo&hellip;</div>
    <script>
        let catalog = null;
        const esc = s => String(s).replace(/[&<>"']/g, c => '&#' + c.charCodeAt(0) + ';');
        async function scan() {{
            const path = document.getElementById('path').value;
            const res = await fetch('/api/scan' + (path ? '?path=' + encodeURIComponent(path) : ''));
            const data = await res.json();
            catalog = data.catalog_id;
            document.getElementById('books').innerHTML = data.ebooks.length
                ? data.ebooks.map(b => `<tr><td><input type="checkbox" value="${{b.index}}"></td>` +
                    `<td>${{esc(b.title)}}</td><td>${{esc(b.author)}}</td>` +
                    `<td><span class="format">${{esc(b.format)}}</span></td></tr>`).join('')
                : '<tr><td colspan="4">No ebooks found.</td></tr>';
            document.getElementById('status').innerHTML =
                `Open on the Kobo: <a href="${{esc(data.kobo_url)}}">${{esc(data.kobo_url)}}</a>`;
        }}
        async function act(url) {{
            if (!catalog) return;
            const indices = [...document.querySelectorAll('#books input:checked')].map(c => +c.value);
            const res = await fetch(url, {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify({{ catalog_id: catalog, indices }})
            }});
            const data = await res.json();
            document.getElementById('status').textContent = data.outcome
                ? `${{data.outcome.message}}. Kobo page: ${{data.kobo_url}}`
                : `Imported ${{data.count}}, already present ${{data.skipped}}, failed ${{data.failed}}`;
        }}
        fetch('/api/kobo-status').then(r => r.json()).then(s => {{
            document.getElementById('status').textContent = s.usb_connected
                ? `Kobo connected over USB (${{s.device_name}})`
                : `No Kobo on USB. Reader URL: ${{s.kobo_url}}` + (s.feed_url ? `, feed: ${{s.feed_url}}` : '');
        }});
    </script>
</body>
</html>"#
    );

    Html(html)
}

/// Simple download page for the Kobo browser.
pub async fn kobo_page(
    State(state): State<AppState>,
    Path(catalog_id): Path<Uuid>,
) -> Result<Html<String>> {
    let catalog = find_catalog(&state, &catalog_id)?;
    let extractor = state.extractor;

    let items = blocking(move || {
        catalog
            .ebooks()
            .iter()
            .enumerate()
            .map(|(i, ebook)| {
                let metadata = extractor.extract(ebook);
                format!(
                    r#"<div class="book"><b>{title}</b><br><span>{author}</span> <span class="format">{format}</span><br><a href="/download/{catalog}/{i}">Download</a></div>"#,
                    title = escape(metadata.display_title(ebook).as_str()),
                    author = escape(metadata.display_author().as_str()),
                    format = escape(ebook.format_label().as_str()),
                    catalog = catalog.id(),
                    i = i,
                )
            })
            .collect::<Vec<_>>()
    })
    .await?;

    let books_html = if items.is_empty() {
        r#"<p>No books. Scan a folder from the computer first.</p>"#.to_string()
    } else {
        items.join("\n")
    };

    Ok(kobo_shell(&state, &books_html))
}

/// Reader landing page: links to every scan held, newest first.
pub async fn kobo_index(State(state): State<AppState>) -> Html<String> {
    let items: Vec<String> = state
        .catalogs()
        .iter()
        .map(|catalog| {
            format!(
                r#"<div class="book"><b>{folder}</b><br><span>{count} book(s), scanned {when}</span><br><a href="/kobo/{id}">Open</a></div>"#,
                folder = escape(catalog.folder().display().to_string().as_str()),
                count = catalog.len(),
                when = catalog.created().format("%Y-%m-%d %H:%M UTC"),
                id = catalog.id(),
            )
        })
        .collect();

    let body = if items.is_empty() {
        r#"<p>No scans yet. Scan a folder from the computer first.</p>"#.to_string()
    } else {
        items.join("\n")
    };

    kobo_shell(&state, &body)
}

/// Page layout sized for the Kobo browser.
fn kobo_shell(state: &AppState, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        body {{ font-family: sans-serif; margin: 0; padding: 10px; }}
        .book {{ border: 2px solid #000; padding: 15px; margin: 10px 0; font-size: 18px; }}
        .format {{ background: #000; color: #fff; padding: 2px 8px; font-size: 12px; }}
        a {{ display: inline-block; margin-top: 10px; padding: 10px 20px; background: #000; color: #fff; text-decoration: none; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    {body}
</body>
</html>"#,
        title = escape(state.config.server.title.as_str()),
        body = body,
    ))
}

/// Download a scanned book by position.
pub async fn download(
    State(state): State<AppState>,
    Path((catalog_id, index)): Path<(Uuid, usize)>,
) -> Result<Response<Body>> {
    let catalog = find_catalog(&state, &catalog_id)?;
    let ebook = catalog
        .get(index)
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", index)))?;

    let file = tokio::fs::File::open(&ebook.path).await?;
    let size = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    let content_type = ebook
        .format()
        .map(|f| f.mime_type())
        .unwrap_or("application/octet-stream");
    let filename = ebook.filename();
    let content_disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        filename.replace('"', "_"),
        urlencoding::encode(filename)
    );

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, size)
        .body(body)
        .unwrap_or_else(|_| Response::default()))
}

// ============================================================================
// JSON API
// ============================================================================

/// Scan query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ScanParams {
    path: Option<String>,
}

/// One scanned book as shown in the list.
#[derive(Debug, Serialize)]
pub struct EbookEntry {
    index: usize,
    title: String,
    author: String,
    format: String,
    path: String,
}

/// Scan response.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    catalog_id: Uuid,
    folder: String,
    scanned_at: DateTime<Utc>,
    kobo_url: String,
    ebooks: Vec<EbookEntry>,
}

/// API: scan a folder.
pub async fn api_scan(
    State(state): State<AppState>,
    Query(params): Query<ScanParams>,
) -> Result<Json<ScanResponse>> {
    let folder = match params.path.as_deref().filter(|p| !p.is_empty() && *p != "downloads") {
        Some(path) => expand_home(&PathBuf::from(path)),
        None => state.config.scan.default_folder(),
    };

    let response = blocking(move || {
        let catalog = state.scan(&folder);
        let ebooks = catalog
            .ebooks()
            .iter()
            .enumerate()
            .map(|(index, ebook)| entry(&state, index, ebook))
            .collect();

        ScanResponse {
            catalog_id: catalog.id(),
            folder: catalog.folder().display().to_string(),
            scanned_at: catalog.created(),
            kobo_url: kobo_url(&state, catalog.id()),
            ebooks,
        }
    })
    .await?;

    Ok(Json(response))
}

fn entry(state: &AppState, index: usize, ebook: &EbookRef) -> EbookEntry {
    let metadata = state.extractor.extract(ebook);
    EbookEntry {
        index,
        title: metadata.display_title(ebook),
        author: metadata.display_author(),
        format: ebook.format_label(),
        path: ebook.path.display().to_string(),
    }
}

/// Books picked from a scan.
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    catalog_id: Uuid,
    #[serde(default)]
    indices: Vec<usize>,
}

/// Import response.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    success: bool,
    count: usize,
    skipped: usize,
    failed: usize,
    ids: Vec<u32>,
}

/// API: import selected books into Calibre.
pub async fn api_import(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<ImportResponse>> {
    let catalog = find_catalog(&state, &request.catalog_id)?;
    let selected = catalog.select(&request.indices);

    let report = blocking(move || state.orchestrator.import(&selected)).await?;

    Ok(Json(ImportResponse {
        success: true,
        count: report.imported_count(),
        skipped: report.skipped_count(),
        failed: report.failed_count(),
        ids: report.ids(),
    }))
}

/// Send response.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    success: bool,
    kobo_url: String,
    outcome: DeliveryOutcome,
}

/// API: import selected books and deliver them to the Kobo.
pub async fn api_send(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SendResponse>> {
    let catalog = find_catalog(&state, &request.catalog_id)?;
    let selected = catalog.select(&request.indices);

    let (outcome, kobo_url) = blocking(move || {
        let outcome = state.orchestrator.deliver(&selected);
        (outcome, kobo_url(&state, catalog.id()))
    })
    .await?;

    Ok(Json(SendResponse {
        success: true,
        kobo_url,
        outcome,
    }))
}

/// API: Kobo connection status.
pub async fn api_kobo_status(State(state): State<AppState>) -> Result<Json<DeviceStatus>> {
    let status = blocking(move || state.orchestrator.status()).await?;
    Ok(Json(status))
}
