mod pages;
mod process;
mod search;
mod stats;

pub use pages::{index, statistics_page};
pub use process::{process_files, upload};
pub use search::search;
pub use stats::statistics;

use std::path::Path;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tokio::task::spawn_blocking;

use spacexp_common::catalog::CatalogRow;
use spacexp_common::config::IndexConfig;
use spacexp_extract_dispatch::Indexer;

use crate::html;

// ── Shared helpers ─────────────────────────────────────────────────────────────

/// Run SQLite or filesystem work off the async runtime.
pub(super) async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(anyhow::anyhow!(e)))
}

pub(super) fn error_page(status: StatusCode, message: &str) -> Response {
    (status, Html(html::error_page(message))).into_response()
}

/// Index `dir` and replace the whole catalog with the result.
///
/// With `relative_paths`, stored paths are relative to `dir`; used for
/// uploads, whose temporary directory is gone once the request ends.
pub(super) fn rebuild_catalog(
    db_path: &Path,
    index: &IndexConfig,
    dir: &Path,
    relative_paths: bool,
) -> anyhow::Result<usize> {
    let report = Indexer::new(index).run(dir, |_, _| {})?;
    let mut rows: Vec<CatalogRow> = report.records.iter().map(CatalogRow::from).collect();
    if relative_paths {
        for row in &mut rows {
            if let Ok(rel) = Path::new(&row.file_path).strip_prefix(dir) {
                row.file_path = rel.to_string_lossy().into_owned();
            }
        }
    }
    let conn = spacexp_store::open(db_path)?;
    spacexp_store::replace_all(&conn, &rows)?;
    spacexp_store::set_last_index(&conn, chrono::Utc::now().timestamp())?;
    Ok(rows.len())
}
