use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};

use crate::models::{FailureEnvelope, JsonSearchResponse, SearchParams, SearchRequest};
use crate::render::JsonRenderer;
use crate::state::AppState;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Query string first, then the body, whatever the body's content type.
fn search_request(query: Option<String>, body: &Bytes) -> SearchRequest {
    SearchRequest::from_params(&SearchParams::from_urlencoded(query.as_deref(), body))
}

/// GET|POST /api/search/html - Result list as an embeddable HTML fragment.
///
/// Parameters: `q` (search text), `dir` (directory to search), `offset`.
/// Rejected or failed searches answer with an empty body.
pub async fn search_html(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Html<String>, (StatusCode, String)> {
    let request = search_request(query, &body);
    tokio::task::spawn_blocking(move || state.search.search_html(&headers, &request))
        .await
        .map(Html)
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Search error: {e}"),
            )
        })
}

/// GET|POST /api/search/json - Result list as JSON for the client-side UI.
///
/// Parameters: `q` (search text), `dir` (optional directory to search).
/// Always 200; check `success` in the body.
pub async fn search_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> impl IntoResponse {
    let request = search_request(query, &body);
    let body = tokio::task::spawn_blocking(move || {
        state.search.search_json_body(&headers, &request)
    })
    .await
    .unwrap_or_else(|e| {
        tracing::error!("Search task failed: {e}");
        JsonRenderer::new().to_body(&JsonSearchResponse::Failed(FailureEnvelope::search_failed()))
    });

    ([(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], body)
}
