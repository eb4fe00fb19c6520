use crate::error::RepositoryResult;
use crate::models::{HitRecord, ResultSet};
use crate::query::escape::escape_html;
use crate::rewrite::{to_site_url, UrlRewriter};

/// Renders a result page as an embeddable HTML fragment.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    teaser_property: String,
}

impl HtmlRenderer {
    pub fn new(teaser_property: impl Into<String>) -> Self {
        Self {
            teaser_property: teaser_property.into(),
        }
    }

    /// Empty string when nothing matched; the caller decides what to show then.
    ///
    /// A hit that cannot be read is logged and left out, the rest still render.
    pub fn render(&self, result: &ResultSet, rewriter: &dyn UrlRewriter) -> String {
        if result.total_matches == 0 {
            return String::new();
        }

        let mut out = format!(
            "<p>About {} results ({})</p><br><div style='margin: 20px' class='search-result'><ul>",
            result.total_matches,
            elapsed(result.execution_time_millis)
        );
        for hit in &result.hits {
            match self.entry(hit.as_ref(), rewriter) {
                Ok(entry) => out.push_str(&entry),
                Err(e) => tracing::warn!("Skipping search hit: {e}"),
            }
        }
        out.push_str("</ul></div>");
        out
    }

    fn entry(&self, hit: &dyn HitRecord, rewriter: &dyn UrlRewriter) -> RepositoryResult<String> {
        let path = hit.path()?;
        let title = hit.title()?;
        let properties = hit.properties()?;
        let teaser = properties
            .get(&self.teaser_property)
            .map(String::as_str)
            .unwrap_or("");
        let url = to_site_url(rewriter, &path);

        Ok(format!(
            "<li><div class='search-link'><a href='{}'>{}</a></div><div class='link-teaser'>{}</div></li>",
            escape_html(&url),
            escape_html(&title),
            escape_html(teaser)
        ))
    }
}

/// Whole seconds from one second up, milliseconds below.
fn elapsed(millis: u64) -> String {
    let secs = millis / 1000;
    if secs > 0 {
        format!("{secs} seconds")
    } else {
        format!("{millis} ms")
    }
}
