use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use spacexp_common::catalog::CatalogQuery;

use crate::AppState;

use super::blocking;

// ── GET /api/search?name=&min_size=&max_size=&created_since=&modified_since= ──

/// Raw form values; blank fields are ignored.
#[derive(Deserialize, Default)]
pub struct SearchParams {
    pub name: Option<String>,
    pub min_size: Option<String>,
    pub max_size: Option<String>,
    pub created_since: Option<String>,
    pub modified_since: Option<String>,
}

impl SearchParams {
    fn into_query(self) -> anyhow::Result<CatalogQuery> {
        CatalogQuery {
            name: self.name,
            min_size: parse_size("min_size", self.min_size)?,
            max_size: parse_size("max_size", self.max_size)?,
            created_since: self.created_since,
            modified_since: self.modified_since,
        }
        .normalized()
    }
}

fn parse_size(field: &str, value: Option<String>) -> anyhow::Result<Option<u64>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("invalid {field} '{v}': expected a byte count")),
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message }))).into_response()
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(e) => return bad_request(format!("{e:#}")),
    };

    let db_path = state.db_path.clone();
    match blocking(move || {
        let conn = spacexp_store::open(&db_path)?;
        spacexp_store::search(&conn, &query)
    })
    .await
    {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => {
            tracing::error!("search: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
