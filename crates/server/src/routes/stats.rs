use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use spacexp_common::humanize::humanize_file_size;
use spacexp_common::stats::{
    ExtensionCount, LargestDocument, LargestImage, StatisticsReport, DEFAULT_TOP_N,
};

use crate::AppState;

use super::blocking;

/// A largest-files entry with its size already humanized.
#[derive(Debug, Serialize, Deserialize)]
pub struct SizedFile {
    pub file_name: String,
    pub file_size: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub file_statistics: Vec<ExtensionCount>,
    pub largest_files: Vec<SizedFile>,
    pub largest_images: Vec<LargestImage>,
    pub largest_documents: Vec<LargestDocument>,
    pub total_size: String,
}

impl From<StatisticsReport> for StatisticsResponse {
    fn from(r: StatisticsReport) -> Self {
        StatisticsResponse {
            file_statistics: r.file_statistics,
            largest_files: r
                .largest_files
                .into_iter()
                .map(|f| SizedFile { file_name: f.file_name, file_size: humanize_file_size(f.file_size) })
                .collect(),
            largest_images: r.largest_images,
            largest_documents: r.largest_documents,
            total_size: humanize_file_size(r.summary.total_size),
        }
    }
}

pub(super) async fn load_report(state: &AppState) -> anyhow::Result<StatisticsReport> {
    let db_path = state.db_path.clone();
    blocking(move || {
        let conn = spacexp_store::open(&db_path)?;
        spacexp_store::report(&conn, DEFAULT_TOP_N)
    })
    .await
}

// ── GET /api/statistics ───────────────────────────────────────────────────────

pub async fn statistics(State(state): State<Arc<AppState>>) -> Response {
    match load_report(&state).await {
        Ok(report) => Json(StatisticsResponse::from(report)).into_response(),
        Err(e) => {
            tracing::error!("statistics: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
