use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use crate::AppState;

use super::{blocking, error_page, rebuild_catalog};

const STATISTICS_PAGE: &str = "/api/statistics-page";

// ── POST /api/process-files ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ProcessForm {
    #[serde(default)]
    pub folder_path: String,
}

pub async fn process_files(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ProcessForm>,
) -> Response {
    let folder = form.folder_path.trim();
    if folder.is_empty() {
        return error_page(StatusCode::BAD_REQUEST, "No folder selected. Please choose a folder.");
    }
    let dir = PathBuf::from(folder);
    if !dir.is_dir() {
        return error_page(StatusCode::BAD_REQUEST, "Folder path does not exist.");
    }

    let db_path = state.db_path.clone();
    let index = state.index.clone();
    let result = blocking(move || rebuild_catalog(&db_path, &index, &dir, false)).await;
    finish(result, folder)
}

// ── POST /api/upload ──────────────────────────────────────────────────────────

pub async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("upload: creating temporary directory: {e}");
            return error_page(StatusCode::INTERNAL_SERVER_ERROR, "Could not store the uploaded files.");
        }
    };

    let mut saved = 0usize;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return error_page(StatusCode::BAD_REQUEST, &format!("Invalid upload: {e}")),
        };
        if field.name() != Some("files") {
            continue;
        }
        // Keep only the final component so names cannot escape the directory.
        let Some(name) = field
            .file_name()
            .and_then(|n| Path::new(n).file_name())
            .map(|n| n.to_os_string())
        else {
            continue;
        };
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => return error_page(StatusCode::BAD_REQUEST, &format!("Invalid upload: {e}")),
        };
        if let Err(e) = tokio::fs::write(dir.path().join(&name), &bytes).await {
            tracing::error!("upload: writing {}: {e}", name.to_string_lossy());
            return error_page(StatusCode::INTERNAL_SERVER_ERROR, "Could not store the uploaded files.");
        }
        saved += 1;
    }

    if saved == 0 {
        return error_page(StatusCode::BAD_REQUEST, "No files selected. Please choose files to upload.");
    }

    let db_path = state.db_path.clone();
    let index = state.index.clone();
    let result = blocking(move || {
        let n = rebuild_catalog(&db_path, &index, dir.path(), true)?;
        dir.close()?;
        Ok(n)
    })
    .await;
    finish(result, &format!("{saved} uploaded files"))
}

fn finish(result: anyhow::Result<usize>, what: &str) -> Response {
    match result {
        Ok(n) => {
            tracing::info!("indexed {what}: {n} files");
            Redirect::to(STATISTICS_PAGE).into_response()
        }
        Err(e) => {
            tracing::error!("indexing {what}: {e:#}");
            error_page(StatusCode::INTERNAL_SERVER_ERROR, &format!("Indexing failed: {e:#}"))
        }
    }
}
