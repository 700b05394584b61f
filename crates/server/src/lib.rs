pub mod html;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use spacexp_common::config::IndexConfig;

pub struct AppState {
    /// SQLite catalog; each request opens its own connection.
    pub db_path: PathBuf,
    pub index: IndexConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/",                    get(routes::index))
        .route("/api/process-files",   post(routes::process_files))
        .route("/api/upload",          post(routes::upload))
        .route("/api/statistics",      get(routes::statistics))
        .route("/api/statistics-page", get(routes::statistics_page))
        .route("/api/search",          get(routes::search))
        .layer(DefaultBodyLimit::max(512 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
