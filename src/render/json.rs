use crate::error::RepositoryResult;
use crate::models::{
    FailureEnvelope, HitRecord, JsonHit, JsonSearchResponse, ResultSet, SearchEnvelope,
};
use crate::rewrite::{to_site_url, UrlRewriter};

/// Property holding the display title of a hit.
const TITLE_PROPERTY: &str = "jcr:title";

/// Body sent when even the failure envelope cannot be encoded.
const FALLBACK_BODY: &str = r#"{"success":false,"error":"Search Failed"}"#;

/// Builds the JSON envelope consumed by the client-side search UI.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl JsonRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Build the whole envelope up front. The first unreadable hit fails the
    /// page, so callers never send a half-written document.
    pub fn render(
        &self,
        result: &ResultSet,
        rewriter: &dyn UrlRewriter,
    ) -> RepositoryResult<SearchEnvelope> {
        let hits = result
            .hits
            .iter()
            .map(|hit| json_hit(hit.as_ref(), rewriter))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok(SearchEnvelope {
            success: true,
            results: hits.len(),
            total: result.total_matches,
            offset: result.start_index,
            hits,
        })
    }

    /// Encode a response body, falling back to a fixed failure body.
    pub fn to_body(&self, response: &JsonSearchResponse) -> String {
        match serde_json::to_string(response) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to encode search response: {e}");
                FALLBACK_BODY.to_string()
            }
        }
    }

    pub fn no_results(&self) -> JsonSearchResponse {
        JsonSearchResponse::Failed(FailureEnvelope::no_results())
    }
}

fn json_hit(hit: &dyn HitRecord, rewriter: &dyn UrlRewriter) -> RepositoryResult<JsonHit> {
    let path = hit.path()?;
    let excerpt = hit.excerpt()?;
    let name = last_segment(&path).to_string();
    let title = hit
        .properties()?
        .remove(TITLE_PROPERTY)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| name.clone());

    Ok(JsonHit {
        path: to_site_url(rewriter, &path),
        excerpt,
        name,
        title,
    })
}

/// `/content/site/about` -> `about`
fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::models::{Hit, Properties};

    struct Suffix;

    impl UrlRewriter for Suffix {
        fn transform(&self, path: &str) -> RepositoryResult<Option<String>> {
            Ok(Some(format!("{path}.html")))
        }
    }

    struct Unreadable;

    impl HitRecord for Unreadable {
        fn path(&self) -> RepositoryResult<String> {
            Err(RepositoryError::HitRead {
                path: "?".to_string(),
                reason: "access denied".to_string(),
            })
        }
        fn title(&self) -> RepositoryResult<String> {
            Ok(String::new())
        }
        fn excerpt(&self) -> RepositoryResult<Option<String>> {
            Ok(None)
        }
        fn properties(&self) -> RepositoryResult<Properties> {
            Ok(Properties::new())
        }
    }

    fn result(hits: Vec<Box<dyn HitRecord>>) -> ResultSet {
        ResultSet {
            total_matches: 17,
            start_index: 10,
            execution_time_millis: 4,
            hits,
            query_statement: String::new(),
        }
    }

    #[test]
    fn test_envelope_metadata() {
        let hits: Vec<Box<dyn HitRecord>> = vec![
            Box::new(Hit::new("/content/site/a", "A")),
            Box::new(Hit::new("/content/site/b", "B")),
        ];
        let envelope = JsonRenderer::new().render(&result(hits), &Suffix).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.results, 2);
        assert_eq!(envelope.total, 17);
        assert_eq!(envelope.offset, 10);
    }

    #[test]
    fn test_hit_fields() {
        let hits: Vec<Box<dyn HitRecord>> = vec![Box::new(
            Hit::new("/content/site/a", "Search title").with_property("jcr:title", "A"),
        )];
        let envelope = JsonRenderer::new().render(&result(hits), &Suffix).unwrap();
        let hit = &envelope.hits[0];
        assert_eq!(hit.name, "a");
        assert_eq!(hit.title, "A");
        assert_eq!(hit.path, "/content/site/a.html");
    }

    #[test]
    fn test_title_falls_back_to_name() {
        let hits: Vec<Box<dyn HitRecord>> = vec![
            Box::new(Hit::new("/content/site/contact", "Contact")),
            Box::new(Hit::new("/content/site/blank", "Blank").with_property("jcr:title", "  ")),
        ];
        let envelope = JsonRenderer::new().render(&result(hits), &Suffix).unwrap();
        assert_eq!(envelope.hits[0].title, "contact");
        assert_eq!(envelope.hits[1].title, "blank");
    }

    #[test]
    fn test_excerpt_key_absent_when_missing() {
        let hits: Vec<Box<dyn HitRecord>> = vec![
            Box::new(Hit::new("/content/site/a", "A")),
            Box::new(Hit::new("/content/site/b", "B").with_excerpt("...b...")),
        ];
        let renderer = JsonRenderer::new();
        let envelope = renderer.render(&result(hits), &Suffix).unwrap();
        let body = renderer.to_body(&JsonSearchResponse::Found(envelope));

        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        let first = value["hits"][0].as_object().unwrap();
        assert!(!first.contains_key("excerpt"));
        assert_eq!(value["hits"][1]["excerpt"], "...b...");
    }

    #[test]
    fn test_unreadable_hit_fails_whole_page() {
        let hits: Vec<Box<dyn HitRecord>> = vec![
            Box::new(Hit::new("/content/site/a", "A")),
            Box::new(Unreadable),
        ];
        let err = JsonRenderer::new().render(&result(hits), &Suffix).unwrap_err();
        assert!(matches!(err, RepositoryError::HitRead { .. }));
    }

    #[test]
    fn test_no_results_body() {
        let renderer = JsonRenderer::new();
        assert_eq!(
            renderer.to_body(&renderer.no_results()),
            r#"{"success":false,"error":"No Results"}"#
        );
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("/content/site/a"), "a");
        assert_eq!(last_segment("/content/site/a/"), "a");
        assert_eq!(last_segment("a"), "a");
        assert_eq!(last_segment("/"), "");
    }
}
