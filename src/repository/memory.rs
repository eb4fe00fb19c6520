use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{Hit, HitRecord, ResultSet};
use crate::query::builder::{LAST_MODIFIED, PAGE_TYPE};
use crate::query::PredicateSpec;
use crate::repository::{Query, QueryEngine, Session, SessionProvider};

/// Header naming the user a session is opened for.
pub const USER_HEADER: &str = "x-content-user";

const EXCERPT_CONTEXT: usize = 40;

/// A page as stored in the content fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPage {
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Body text searched by full-text predicates
    #[serde(default)]
    pub text: String,
    pub last_modified: DateTime<Utc>,
    #[serde(rename = "type", default = "default_page_type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

fn default_page_type() -> String {
    PAGE_TYPE.to_string()
}

impl ContentPage {
    fn property(&self, name: &str) -> Option<&str> {
        match name {
            "jcr:title" => Some(self.title.as_str()),
            "jcr:description" => Some(self.description.as_str()),
            other => self.properties.get(other).map(String::as_str),
        }
    }

    fn in_scope(&self, scope: &str) -> bool {
        let scope = scope.trim_end_matches('/');
        scope.is_empty()
            || self.path == scope
            || self
                .path
                .strip_prefix(scope)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    fn to_hit(&self, excerpt: Option<String>) -> Hit {
        let mut properties = self.properties.clone();
        properties.insert("jcr:title".to_string(), self.title.clone());
        if !self.description.is_empty() {
            properties.insert("jcr:description".to_string(), self.description.clone());
        }
        Hit {
            path: self.path.clone(),
            title: self.title.clone(),
            excerpt,
            properties,
        }
    }
}

/// In-memory content repository that evaluates the search predicate
/// vocabulary over a fixed set of pages.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    pages: Vec<ContentPage>,
    page_size: usize,
}

impl MemoryRepository {
    pub fn new(pages: Vec<ContentPage>, page_size: usize) -> Self {
        Self { pages, page_size }
    }

    /// Load pages from a JSON array on disk.
    pub fn load(path: &Path, page_size: usize) -> RepositoryResult<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| RepositoryError::Fixture(format!("{}: {e}", path.display())))?;
        let pages: Vec<ContentPage> = serde_json::from_str(&data)
            .map_err(|e| RepositoryError::Fixture(format!("{}: {e}", path.display())))?;
        tracing::info!("Loaded {} pages from {}", pages.len(), path.display());
        Ok(Self::new(pages, page_size))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl SessionProvider for MemoryRepository {
    fn session(&self, headers: &HeaderMap) -> RepositoryResult<Session> {
        match headers.get(USER_HEADER) {
            Some(value) => {
                let user = value
                    .to_str()
                    .map_err(|e| RepositoryError::Session(format!("invalid user header: {e}")))?
                    .trim();
                if user.is_empty() {
                    Ok(Session::anonymous())
                } else {
                    Ok(Session {
                        user_id: user.to_string(),
                    })
                }
            }
            None => Ok(Session::anonymous()),
        }
    }
}

impl QueryEngine for MemoryRepository {
    fn create_query<'a>(
        &'a self,
        spec: PredicateSpec,
        session: &'a Session,
    ) -> RepositoryResult<Box<dyn Query + 'a>> {
        let plan = QueryPlan::parse(&spec, self.page_size)?;
        Ok(Box::new(MemoryQuery {
            repo: self,
            statement: spec.to_string(),
            plan,
            session,
        }))
    }
}

struct MemoryQuery<'a> {
    repo: &'a MemoryRepository,
    statement: String,
    plan: QueryPlan,
    session: &'a Session,
}

impl Query for MemoryQuery<'_> {
    fn result(&self) -> RepositoryResult<ResultSet> {
        let start = Instant::now();
        let plan = &self.plan;

        let mut matched: Vec<(&ContentPage, Option<String>)> = self
            .repo
            .pages
            .iter()
            .filter(|p| plan.scope.as_deref().is_none_or(|s| p.in_scope(s)))
            .filter(|p| plan.node_type.as_deref().is_none_or(|t| p.node_type == t))
            .filter_map(|p| plan.evaluate(p).map(|excerpt| (p, excerpt)))
            .collect();

        if let Some(order) = &plan.order {
            matched.sort_by(|(a, _), (b, _)| a.last_modified.cmp(&b.last_modified));
            if order.descending {
                matched.reverse();
            }
        }

        let total_matches = matched.len() as u64;
        let hits: Vec<Box<dyn HitRecord>> = matched
            .into_iter()
            .skip(plan.offset as usize)
            .take(plan.limit)
            .map(|(page, excerpt)| Box::new(page.to_hit(excerpt)) as Box<dyn HitRecord>)
            .collect();

        tracing::debug!(
            user = %self.session.user_id,
            "Evaluated query against {} pages",
            self.repo.pages.len()
        );

        Ok(ResultSet {
            hits,
            total_matches,
            execution_time_millis: start.elapsed().as_millis() as u64,
            start_index: plan.offset,
            query_statement: self.statement.clone(),
        })
    }
}

/// Sort by last modified date.
#[derive(Debug)]
struct SortOrder {
    descending: bool,
}

#[derive(Debug)]
enum Criterion {
    Property {
        name: String,
        lower_case: bool,
        pattern: String,
    },
    FullText {
        text: String,
    },
}

#[derive(Debug)]
struct QueryPlan {
    scope: Option<String>,
    node_type: Option<String>,
    criteria: Vec<Criterion>,
    any: bool,
    offset: u64,
    limit: usize,
    order: Option<SortOrder>,
}

impl QueryPlan {
    fn parse(spec: &PredicateSpec, page_size: usize) -> RepositoryResult<Self> {
        let mut plan = QueryPlan {
            scope: None,
            node_type: None,
            criteria: Vec::new(),
            any: false,
            offset: 0,
            limit: page_size,
            order: None,
        };

        let mut groups: Vec<(String, GroupMember)> = Vec::new();
        for (name, value) in spec.iter() {
            match name {
                "path" => plan.scope = Some(value.to_string()),
                "type" => plan.node_type = Some(value.to_string()),
                "group.p.or" => plan.any = value == "true",
                "p.offset" => plan.offset = parse_number(name, value)?,
                "orderby" => {
                    if value != LAST_MODIFIED {
                        return Err(RepositoryError::Query(format!(
                            "unsupported sort property {value}"
                        )));
                    }
                    plan.order = Some(SortOrder { descending: false });
                }
                "orderby.sort" => {
                    if let Some(order) = plan.order.as_mut() {
                        order.descending = value.eq_ignore_ascii_case("desc");
                    }
                }
                // Hint only: everything here is already in memory.
                "orderby.index" => {}
                _ => {
                    let Some(member) = name.strip_prefix("group.") else {
                        return Err(RepositoryError::Query(format!(
                            "unsupported predicate {name}"
                        )));
                    };
                    let (key, field) = member.split_once('.').unwrap_or((member, ""));
                    let idx = match groups.iter().position(|(k, _)| k == key) {
                        Some(idx) => idx,
                        None => {
                            groups.push((key.to_string(), GroupMember::default()));
                            groups.len() - 1
                        }
                    };
                    let entry = &mut groups[idx].1;
                    match field {
                        "" => entry.main = Some(value.to_string()),
                        "value" => entry.value = Some(value.to_string()),
                        "operation" => entry.operation = Some(value.to_string()),
                        "relPath" => {}
                        other => {
                            return Err(RepositoryError::Query(format!(
                                "unsupported predicate option group.{key}.{other}"
                            )))
                        }
                    }
                }
            }
        }

        for (key, member) in groups {
            plan.criteria.push(member.into_criterion(&key)?);
        }
        Ok(plan)
    }

    /// `None` when the page does not match, otherwise the excerpt (if any).
    fn evaluate(&self, page: &ContentPage) -> Option<Option<String>> {
        if self.criteria.is_empty() {
            return Some(None);
        }

        let mut excerpt = None;
        let mut any_matched = false;
        let mut all_matched = true;
        // Every member is evaluated so a full-text excerpt is still collected.
        for criterion in &self.criteria {
            let matched = match criterion {
                Criterion::Property {
                    name,
                    lower_case,
                    pattern,
                } => page.property(name).is_some_and(|actual| {
                    if *lower_case {
                        like_matches(pattern, &actual.to_lowercase())
                    } else {
                        like_matches(pattern, actual)
                    }
                }),
                Criterion::FullText { text } => match fulltext_match(page, text) {
                    Some(found) => {
                        if excerpt.is_none() {
                            excerpt = found;
                        }
                        true
                    }
                    None => false,
                },
            };
            any_matched |= matched;
            all_matched &= matched;
        }

        let matched = if self.any { any_matched } else { all_matched };
        matched.then_some(excerpt)
    }
}

#[derive(Debug, Default)]
struct GroupMember {
    /// `group.N_property` or `group.N_fulltext` value
    main: Option<String>,
    value: Option<String>,
    operation: Option<String>,
}

impl GroupMember {
    fn into_criterion(self, key: &str) -> RepositoryResult<Criterion> {
        let kind = key.split_once('_').map(|(_, kind)| kind).unwrap_or(key);
        let main = self
            .main
            .ok_or_else(|| RepositoryError::Query(format!("group member {key} has no value")))?;
        match kind {
            "fulltext" => Ok(Criterion::FullText {
                text: unescape(&main).to_lowercase(),
            }),
            "property" => {
                let (name, lower_case) = parse_property(&main);
                match self.operation.as_deref() {
                    Some("like") => Ok(Criterion::Property {
                        name,
                        lower_case,
                        pattern: self.value.unwrap_or_default(),
                    }),
                    other => Err(RepositoryError::Query(format!(
                        "unsupported operation {other:?} on {key}"
                    ))),
                }
            }
            other => Err(RepositoryError::Query(format!(
                "unsupported predicate type {other}"
            ))),
        }
    }
}

fn parse_number(name: &str, value: &str) -> RepositoryResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| RepositoryError::Query(format!("{name} is not a number: {value}")))
}

/// `fn:lower-case(@jcr:content/jcr:title)` -> (`jcr:title`, true)
fn parse_property(expr: &str) -> (String, bool) {
    let (inner, lower_case) = match expr
        .strip_prefix("fn:lower-case(")
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (inner, true),
        None => (expr, false),
    };
    let name = inner.trim_start_matches('@');
    let name = name.strip_prefix("jcr:content/").unwrap_or(name);
    (name.to_string(), lower_case)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// SQL-style `like`: `%` is any run, `_` is one character, `\` escapes.
fn like_matches(pattern: &str, text: &str) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Token {
        Any,
        One,
        Lit(char),
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Lit(chars.next().unwrap_or('\\')),
            c => Token::Lit(c),
        });
    }

    let text: Vec<char> = text.chars().collect();
    // dp[j]: tokens[..i] matches text[..j]
    let mut dp = vec![false; text.len() + 1];
    dp[0] = true;
    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::Any => {
                let mut reachable = false;
                for j in 0..=text.len() {
                    reachable |= dp[j];
                    next[j] = reachable;
                }
            }
            Token::One => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1];
                }
            }
            Token::Lit(c) => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1] && text[j - 1] == c;
                }
            }
        }
        dp = next;
    }
    dp[text.len()]
}

/// Case-insensitive containment over title, description and body text.
/// Returns `Some(excerpt)` on a match; the excerpt is only taken from the body.
fn fulltext_match(page: &ContentPage, needle: &str) -> Option<Option<String>> {
    if needle.is_empty() {
        return None;
    }
    if let Some(excerpt) = excerpt_around(&page.text, needle) {
        return Some(Some(excerpt));
    }
    let in_meta = page.title.to_lowercase().contains(needle)
        || page.description.to_lowercase().contains(needle);
    in_meta.then_some(None)
}

fn excerpt_around(text: &str, needle: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let lower: Vec<char> = chars.iter().flat_map(|c| c.to_lowercase()).collect();
    // Lower-casing can change lengths; fall back to char-by-char search only
    // when it did not.
    if lower.len() != chars.len() {
        return text
            .to_lowercase()
            .contains(needle)
            .then(|| chars.iter().take(EXCERPT_CONTEXT * 2).collect());
    }

    let needle: Vec<char> = needle.chars().collect();
    let pos = lower
        .windows(needle.len())
        .position(|w| w == needle.as_slice())?;

    let start = pos.saturating_sub(EXCERPT_CONTEXT);
    let end = (pos + needle.len() + EXCERPT_CONTEXT).min(chars.len());
    let mut excerpt = String::new();
    if start > 0 {
        excerpt.push_str("...");
    }
    excerpt.extend(&chars[start..end]);
    if end < chars.len() {
        excerpt.push_str("...");
    }
    Some(excerpt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchRequest;
    use crate::query::{QuerySpecBuilder, SearchProfile};
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    fn page(path: &str, title: &str, day: u32) -> ContentPage {
        ContentPage {
            path: path.to_string(),
            title: title.to_string(),
            description: String::new(),
            text: String::new(),
            last_modified: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            node_type: PAGE_TYPE.to_string(),
            properties: HashMap::new(),
        }
    }

    fn repo() -> MemoryRepository {
        let mut annual = page("/content/site/annual-report", "Annual Report", 3);
        annual.text = "Our yearly figures are in.".to_string();
        let mut quarterly = page("/content/site/q1", "Q1 Results", 5);
        quarterly.text = "The quarterly report shows growth in every region.".to_string();
        let mut press = page("/content/site/press", "Press", 7);
        press.description = "Reporting for journalists".to_string();
        let other = page("/content/other/report", "Report Elsewhere", 9);
        let mut asset = page("/content/site/report.pdf", "Report PDF", 10);
        asset.node_type = "dam:Asset".to_string();
        MemoryRepository::new(vec![annual, quarterly, press, other, asset], 10)
    }

    fn run(profile: SearchProfile, request: SearchRequest) -> ResultSet {
        let repo = repo();
        let spec = QuerySpecBuilder::new(profile).build(&request).unwrap();
        let session = Session::anonymous();
        let query = repo.create_query(spec, &session).unwrap();
        query.result().unwrap()
    }

    fn paths(result: &ResultSet) -> Vec<String> {
        result.hits.iter().map(|h| h.path().unwrap()).collect()
    }

    #[test]
    fn test_fulltext_profile_matches_title_and_body() {
        let result = run(
            SearchProfile::html(),
            SearchRequest::new("report", Some("/content/site"), 0),
        );
        // Newest first. The other site is out of scope and the PDF is not a page.
        assert_eq!(
            paths(&result),
            vec![
                "/content/site/press",
                "/content/site/q1",
                "/content/site/annual-report",
            ]
        );
        assert_eq!(result.total_matches, 3);
        assert_eq!(result.hits[0].excerpt().unwrap(), None);
        let excerpt = result.hits[1].excerpt().unwrap().unwrap();
        assert!(excerpt.contains("quarterly report"));
    }

    #[test]
    fn test_description_profile_matches_prefixes() {
        let result = run(SearchProfile::json(), SearchRequest::new("report", None, 0));
        assert_eq!(
            paths(&result),
            vec!["/content/other/report", "/content/site/press"]
        );
    }

    #[test]
    fn test_offset_pages_but_total_counts_all() {
        let result = run(
            SearchProfile::html(),
            SearchRequest::new("report", Some("/content/site"), 1),
        );
        assert_eq!(
            paths(&result),
            vec!["/content/site/q1", "/content/site/annual-report"]
        );
        assert_eq!(result.total_matches, 3);
        assert_eq!(result.start_index, 1);
    }

    #[test]
    fn test_page_size_limits_hits() {
        let mut repo = repo();
        repo.page_size = 1;
        let spec = QuerySpecBuilder::new(SearchProfile::json())
            .build(&SearchRequest::new("report", None, 0))
            .unwrap();
        let session = Session::anonymous();
        let result = repo.create_query(spec, &session).unwrap().result().unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.total_matches, 2);
    }

    #[test]
    fn test_like_matches() {
        assert!(like_matches("report%", "report"));
        assert!(like_matches("report%", "reports and more"));
        assert!(!like_matches("report%", "annual report"));
        assert!(!like_matches("r_port", "rapport"));
        assert!(like_matches("r_port", "report"));
        assert!(like_matches("50\\%%", "50% off"));
        assert!(!like_matches("50\\%%", "500 off"));
    }

    #[test]
    fn test_scope_requires_segment_boundary() {
        let p = page("/content/sitemap", "x", 1);
        assert!(!p.in_scope("/content/site"));
        assert!(p.in_scope("/content"));
        assert!(p.in_scope("/content/"));
    }

    #[test]
    fn test_unknown_predicate_is_rejected() {
        let repo = repo();
        let mut spec = PredicateSpec::default();
        spec.push("nonsense", "1");
        let session = Session::anonymous();
        assert!(matches!(
            repo.create_query(spec, &session),
            Err(RepositoryError::Query(_))
        ));
    }

    #[test]
    fn test_only_like_comparisons_and_engine_page_size() {
        let repo = repo();
        let session = Session::anonymous();

        let mut equals = PredicateSpec::default();
        equals.push("group.1_property", "jcr:content/jcr:title");
        equals.push("group.1_property.value", "Press");
        equals.push("group.1_property.operation", "equals");
        assert!(matches!(
            repo.create_query(equals, &session),
            Err(RepositoryError::Query(_))
        ));

        let mut limit = PredicateSpec::default();
        limit.push("p.limit", "1");
        assert!(matches!(
            repo.create_query(limit, &session),
            Err(RepositoryError::Query(_))
        ));
    }

    #[test]
    fn test_session_from_header() {
        let repo = repo();
        let mut headers = HeaderMap::new();
        assert_eq!(repo.session(&headers).unwrap(), Session::anonymous());
        headers.insert(USER_HEADER, HeaderValue::from_static("editor"));
        assert_eq!(repo.session(&headers).unwrap().user_id, "editor");
    }

    #[test]
    fn test_load_missing_fixture_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = MemoryRepository::load(&dir.path().join("missing.json"), 10).unwrap_err();
        assert!(matches!(err, RepositoryError::Fixture(_)));
    }

    #[test]
    fn test_load_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        std::fs::write(
            &path,
            r#"[{"path": "/content/site/a", "title": "A", "lastModified": "2024-01-01T00:00:00Z",
                 "properties": {"pageTitle": "Teaser A"}}]"#,
        )
        .unwrap();
        let repo = MemoryRepository::load(&path, 10).unwrap();
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.pages[0].node_type, PAGE_TYPE);
        assert_eq!(repo.pages[0].property("pageTitle"), Some("Teaser A"));
    }
}
