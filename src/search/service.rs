use axum::http::HeaderMap;
use std::sync::Arc;

use crate::error::SearchError;
use crate::models::{FailureEnvelope, JsonSearchResponse, ResultSet, SearchRequest};
use crate::query::{QuerySpecBuilder, SearchProfile};
use crate::render::{HtmlRenderer, JsonRenderer};
use crate::repository::{QueryEngine, SessionProvider};
use crate::rewrite::UrlRewriter;

/// Runs searches against the repository and renders them for either endpoint.
///
/// Holds no per-request state: the query text travels with each call.
#[derive(Clone)]
pub struct SearchService {
    engine: Arc<dyn QueryEngine>,
    sessions: Arc<dyn SessionProvider>,
    rewriter: Arc<dyn UrlRewriter>,
    html: HtmlRenderer,
    json: JsonRenderer,
}

impl SearchService {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        sessions: Arc<dyn SessionProvider>,
        rewriter: Arc<dyn UrlRewriter>,
        teaser_property: &str,
    ) -> Self {
        Self {
            engine,
            sessions,
            rewriter,
            html: HtmlRenderer::new(teaser_property),
            json: JsonRenderer::new(),
        }
    }

    /// Execute one search and hand back the raw result page.
    pub fn search(
        &self,
        headers: &HeaderMap,
        request: &SearchRequest,
        profile: SearchProfile,
    ) -> Result<ResultSet, SearchError> {
        let spec = QuerySpecBuilder::new(profile).build(request)?;
        let session = self.sessions.session(headers)?;
        let query = self.engine.create_query(spec, &session)?;
        let result = query.result()?;

        tracing::info!(
            query = ?request.query_text.trim(),
            user = %session.user_id,
            "Query executed: {}",
            result.query_statement
        );
        tracing::info!(
            "Search matched {} in {} ms",
            result.total_matches,
            result.execution_time_millis
        );
        Ok(result)
    }

    /// HTML fragment for the request; empty when rejected or when the search failed.
    pub fn search_html(&self, headers: &HeaderMap, request: &SearchRequest) -> String {
        match self.search(headers, request, SearchProfile::html()) {
            Ok(result) => self.html.render(&result, self.rewriter.as_ref()),
            Err(SearchError::Rejected(_)) => String::new(),
            Err(SearchError::Repository(e)) => {
                tracing::error!("HTML search failed: {e}");
                String::new()
            }
        }
    }

    /// JSON envelope for the request. Failures are reported in the body.
    pub fn search_json(&self, headers: &HeaderMap, request: &SearchRequest) -> JsonSearchResponse {
        let result = match self.search(headers, request, SearchProfile::json()) {
            Ok(result) => result,
            Err(SearchError::Rejected(reason)) => {
                tracing::debug!("Returning no results: {reason}");
                return self.json.no_results();
            }
            Err(SearchError::Repository(e)) => {
                tracing::error!("JSON search failed: {e}");
                return JsonSearchResponse::Failed(FailureEnvelope::search_failed());
            }
        };

        match self.json.render(&result, self.rewriter.as_ref()) {
            Ok(envelope) => JsonSearchResponse::Found(envelope),
            Err(e) => {
                tracing::error!("Failed to read search hits: {e}");
                JsonSearchResponse::Failed(FailureEnvelope::search_failed())
            }
        }
    }

    /// Encoded JSON body for the request.
    pub fn search_json_body(&self, headers: &HeaderMap, request: &SearchRequest) -> String {
        self.json.to_body(&self.search_json(headers, request))
    }
}
