//! Axum HTTP surface.

pub mod search;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/search/html",
            get(search::search_html).post(search::search_html),
        )
        .route(
            "/api/search/json",
            get(search::search_json).post(search::search_json),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
