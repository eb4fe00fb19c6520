use std::fmt;

use crate::error::Rejection;
use crate::models::SearchRequest;
use crate::query::escape::{escape_fulltext, escape_like};

/// Node type every search is restricted to.
pub const PAGE_TYPE: &str = "cq:Page";
pub const TITLE_PROPERTY: &str = "fn:lower-case(@jcr:content/jcr:title)";
pub const DESCRIPTION_PROPERTY: &str = "fn:lower-case(@jcr:content/jcr:description)";
pub const FULLTEXT_REL_PATH: &str = "jcr:content";
pub const LAST_MODIFIED: &str = "@jcr:content/cq:lastModified";

/// Ordered predicate map handed to the query engine.
///
/// The names and their order are what the engine parses; they are not
/// free to change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateSpec {
    predicates: Vec<(String, String)>,
}

impl PredicateSpec {
    pub(crate) fn push(&mut self, name: &str, value: impl Into<String>) {
        self.predicates.push((name.to_string(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.predicates
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.predicates
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Display for PredicateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

/// Second member of the OR group, next to the title prefix match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternateMatch {
    /// Full-text match on the page content
    FullText,
    /// Prefix match on the page description
    DescriptionPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetPolicy {
    FromRequest,
    Fixed(u64),
}

/// Which predicates a search endpoint sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchProfile {
    pub alternate: AlternateMatch,
    pub offset: OffsetPolicy,
    /// Reject requests without a search directory instead of searching everything
    pub scope_required: bool,
    /// Ask the engine to sort with the help of an index
    pub index_assisted_order: bool,
}

impl SearchProfile {
    /// Profile of the HTML fragment endpoint.
    pub const fn html() -> Self {
        Self {
            alternate: AlternateMatch::FullText,
            offset: OffsetPolicy::FromRequest,
            scope_required: true,
            index_assisted_order: false,
        }
    }

    /// Profile of the JSON endpoint.
    pub const fn json() -> Self {
        Self {
            alternate: AlternateMatch::DescriptionPrefix,
            offset: OffsetPolicy::Fixed(0),
            scope_required: false,
            index_assisted_order: true,
        }
    }
}

/// Turns a [`SearchRequest`] into the predicates for one profile.
#[derive(Debug, Clone, Copy)]
pub struct QuerySpecBuilder {
    profile: SearchProfile,
}

impl QuerySpecBuilder {
    pub fn new(profile: SearchProfile) -> Self {
        Self { profile }
    }

    /// Validate the request and build its predicates.
    ///
    /// Blank queries and queries bounded by `*` are rejected so a single
    /// request cannot scan the whole repository.
    pub fn build(&self, request: &SearchRequest) -> Result<PredicateSpec, Rejection> {
        let text = request.query_text.trim();
        if text.is_empty() {
            tracing::debug!("Rejecting blank search query");
            return Err(Rejection::EmptyQuery);
        }
        if text.starts_with('*') || text.ends_with('*') {
            tracing::debug!("Rejecting wildcard search query: {text:?}");
            return Err(Rejection::Wildcard);
        }

        let scope = request
            .scope_path
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if scope.is_none() && self.profile.scope_required {
            tracing::debug!("Rejecting search without a directory");
            return Err(Rejection::MissingScope);
        }

        let prefix = format!("{}%", escape_like(&text.to_lowercase()));

        let mut spec = PredicateSpec::default();
        if let Some(scope) = scope {
            spec.push("path", scope);
        }
        spec.push("type", PAGE_TYPE);
        spec.push("group.p.or", "true");
        spec.push("group.1_property", TITLE_PROPERTY);
        spec.push("group.1_property.value", prefix.clone());
        spec.push("group.1_property.operation", "like");
        match self.profile.alternate {
            AlternateMatch::FullText => {
                spec.push("group.2_fulltext", escape_fulltext(text));
                spec.push("group.2_fulltext.relPath", FULLTEXT_REL_PATH);
            }
            AlternateMatch::DescriptionPrefix => {
                spec.push("group.2_property", DESCRIPTION_PROPERTY);
                spec.push("group.2_property.value", prefix);
                spec.push("group.2_property.operation", "like");
            }
        }
        let offset = match self.profile.offset {
            OffsetPolicy::FromRequest => request.offset,
            OffsetPolicy::Fixed(n) => n,
        };
        spec.push("p.offset", offset.to_string());
        spec.push("orderby", LAST_MODIFIED);
        spec.push("orderby.sort", "desc");
        if self.profile.index_assisted_order {
            spec.push("orderby.index", "true");
        }

        tracing::debug!(scope = ?scope, "Built search predicates: {spec}");
        Ok(spec)
    }
}
