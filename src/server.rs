//! HTTP server and routes.

pub(crate) mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/scan", get(handlers::api_scan))
        .route("/import", post(handlers::api_import))
        .route("/send", post(handlers::api_send))
        .route("/kobo-status", get(handlers::api_kobo_status));

    Router::new()
        .route("/", get(handlers::index))
        .route("/kobo", get(handlers::kobo_index))
        .route("/kobo/{catalog_id}", get(handlers::kobo_page))
        .route("/download/{catalog_id}/{index}", get(handlers::download))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
