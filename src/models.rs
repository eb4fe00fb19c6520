use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::RepositoryResult;

/// Raw search parameters as they arrive on the query string or form body.
///
/// Every field is optional and untrusted; [`SearchRequest::from_params`]
/// applies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Search text
    pub q: Option<String>,
    /// Repository subtree to search under
    pub dir: Option<String>,
    /// Start index of the requested page
    pub offset: Option<String>,
}

impl SearchParams {
    /// Collect parameters from a query string and a urlencoded body.
    ///
    /// The query string is read before the body and the first value of a
    /// repeated parameter wins. Unknown keys and undecodable pairs are ignored,
    /// so any body (JSON, binary, empty) leaves the affected fields unset.
    pub fn from_urlencoded(query: Option<&str>, body: &[u8]) -> Self {
        let mut params = Self::default();
        let query = form_urlencoded::parse(query.unwrap_or_default().as_bytes());
        for (key, value) in query.chain(form_urlencoded::parse(body)) {
            let slot = match key.as_ref() {
                "q" => &mut params.q,
                "dir" => &mut params.dir,
                "offset" => &mut params.offset,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// One search, scoped to a single HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query_text: String,
    pub scope_path: Option<String>,
    pub offset: u64,
}

impl SearchRequest {
    pub fn new(query_text: impl Into<String>, scope_path: Option<&str>, offset: u64) -> Self {
        Self {
            query_text: query_text.into(),
            scope_path: scope_path.map(str::to_string),
            offset,
        }
    }

    /// Build a request from raw parameters. A missing or malformed offset becomes 0.
    pub fn from_params(params: &SearchParams) -> Self {
        let offset = params
            .offset
            .as_deref()
            .and_then(|o| o.trim().parse::<u64>().ok())
            .unwrap_or(0);

        Self {
            query_text: params.q.clone().unwrap_or_default(),
            scope_path: params.dir.clone(),
            offset,
        }
    }
}

/// Properties of a matched node (or of its `jcr:content` child).
pub type Properties = HashMap<String, String>;

/// Read access to one hit returned by the query engine.
///
/// Every accessor can fail because engines read hits lazily from the
/// repository.
pub trait HitRecord: Send + Sync {
    fn path(&self) -> RepositoryResult<String>;
    fn title(&self) -> RepositoryResult<String>;
    fn excerpt(&self) -> RepositoryResult<Option<String>>;
    fn properties(&self) -> RepositoryResult<Properties>;
}

/// A fully materialized hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hit {
    pub path: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub properties: Properties,
}

impl Hit {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl HitRecord for Hit {
    fn path(&self) -> RepositoryResult<String> {
        Ok(self.path.clone())
    }

    fn title(&self) -> RepositoryResult<String> {
        Ok(self.title.clone())
    }

    fn excerpt(&self) -> RepositoryResult<Option<String>> {
        Ok(self.excerpt.clone())
    }

    fn properties(&self) -> RepositoryResult<Properties> {
        Ok(self.properties.clone())
    }
}

/// One page of results plus the engine's metadata about the whole match set.
pub struct ResultSet {
    pub hits: Vec<Box<dyn HitRecord>>,
    /// Matches across all pages
    pub total_matches: u64,
    pub execution_time_millis: u64,
    pub start_index: u64,
    /// Human-readable form of the executed query, for logs only
    pub query_statement: String,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            total_matches: 0,
            execution_time_millis: 0,
            start_index: 0,
            query_statement: String::new(),
        }
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("hits", &self.hits.len())
            .field("total_matches", &self.total_matches)
            .field("execution_time_millis", &self.execution_time_millis)
            .field("start_index", &self.start_index)
            .field("query_statement", &self.query_statement)
            .finish()
    }
}

/// JSON search response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JsonSearchResponse {
    Found(SearchEnvelope),
    Failed(FailureEnvelope),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchEnvelope {
    pub success: bool,
    /// Hits on this page
    pub results: usize,
    pub total: u64,
    pub offset: u64,
    pub hits: Vec<JsonHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonHit {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: String,
}

impl FailureEnvelope {
    pub const NO_RESULTS: &'static str = "No Results";
    pub const SEARCH_FAILED: &'static str = "Search Failed";

    pub fn no_results() -> Self {
        Self {
            success: false,
            error: Self::NO_RESULTS.to_string(),
        }
    }

    pub fn search_failed() -> Self {
        Self {
            success: false,
            error: Self::SEARCH_FAILED.to_string(),
        }
    }
}
