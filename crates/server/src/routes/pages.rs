use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use spacexp_common::humanize::format_age;

use crate::{html, AppState};

use super::{blocking, error_page, stats::load_report};

// ── GET / ─────────────────────────────────────────────────────────────────────

pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let db_path = state.db_path.clone();
    let result = blocking(move || {
        let conn = spacexp_store::open(&db_path)?;
        let summary = spacexp_store::size_summary(&conn)?;
        let last = spacexp_store::last_index(&conn)?;
        Ok((summary, last))
    })
    .await;

    match result {
        Ok((summary, last)) => {
            let age = last.map(|ts| format_age((chrono::Utc::now().timestamp() - ts).max(0)));
            Html(html::index_page(summary.total_size, summary.total_files, age.as_deref()))
                .into_response()
        }
        Err(e) => {
            tracing::error!("index page: {e:#}");
            error_page(StatusCode::INTERNAL_SERVER_ERROR, "Could not read the catalog.")
        }
    }
}

// ── GET /api/statistics-page ──────────────────────────────────────────────────

pub async fn statistics_page(State(state): State<Arc<AppState>>) -> Response {
    match load_report(&state).await {
        Ok(report) => Html(html::statistics_page(&report)).into_response(),
        Err(e) => {
            tracing::error!("statistics page: {e:#}");
            error_page(StatusCode::INTERNAL_SERVER_ERROR, "Could not read the catalog.")
        }
    }
}
