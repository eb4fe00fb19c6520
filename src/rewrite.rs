//! Mapping of repository paths to public site URLs.

use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, RepositoryResult};

/// Maps an internal repository path to the URL visitors use.
pub trait UrlRewriter: Send + Sync {
    /// `Ok(None)` means the rewriter has no mapping for `path`.
    fn transform(&self, path: &str) -> RepositoryResult<Option<String>>;
}

/// Public URL for `path`, or `path` itself when it is blank or cannot be
/// rewritten.
pub fn to_site_url(rewriter: &dyn UrlRewriter, path: &str) -> String {
    if path.trim().is_empty() {
        return path.to_string();
    }
    match rewriter.transform(path) {
        Ok(Some(url)) => url,
        Ok(None) => path.to_string(),
        Err(e) => {
            tracing::warn!("Keeping repository path for link: {e}");
            path.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Repository subtree that is published as the site root
    pub content_root: String,
    /// Prepended to rewritten paths, e.g. `https://www.example.com`
    pub public_prefix: String,
    /// Appended to rewritten paths
    pub extension: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            content_root: "/content".to_string(),
            public_prefix: String::new(),
            extension: ".html".to_string(),
        }
    }
}

/// Strips the site's content root from page paths.
///
/// `/content/site/about` becomes `{public_prefix}/site/about.html` with the
/// default config. Paths outside the root are left alone.
#[derive(Debug, Clone)]
pub struct ContextRootRewriter {
    config: RewriteConfig,
}

impl ContextRootRewriter {
    pub fn new(config: RewriteConfig) -> Self {
        Self { config }
    }
}

impl UrlRewriter for ContextRootRewriter {
    fn transform(&self, path: &str) -> RepositoryResult<Option<String>> {
        if path.contains("..") {
            return Err(RepositoryError::Rewrite {
                path: path.to_string(),
                reason: "relative segments are not allowed".to_string(),
            });
        }

        let root = self.config.content_root.trim_end_matches('/');
        let rest = match path.strip_prefix(root) {
            Some(rest) if rest.starts_with('/') => rest,
            _ => return Ok(None),
        };

        let rest = rest.trim_end_matches('/');
        let mut url = String::with_capacity(
            self.config.public_prefix.len() + rest.len() + self.config.extension.len() + 1,
        );
        url.push_str(self.config.public_prefix.trim_end_matches('/'));
        if rest.is_empty() {
            url.push('/');
        } else {
            url.push_str(rest);
            url.push_str(&self.config.extension);
        }
        Ok(Some(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter(prefix: &str) -> ContextRootRewriter {
        ContextRootRewriter::new(RewriteConfig {
            public_prefix: prefix.to_string(),
            ..RewriteConfig::default()
        })
    }

    #[test]
    fn test_rewrites_pages_under_root() {
        let r = rewriter("https://www.example.com/");
        assert_eq!(
            to_site_url(&r, "/content/site/about"),
            "https://www.example.com/site/about.html"
        );
        assert_eq!(to_site_url(&r, "/content/site/"), "https://www.example.com/site.html");
    }

    #[test]
    fn test_root_itself_maps_to_slash() {
        assert_eq!(to_site_url(&rewriter(""), "/content"), "/content");
        assert_eq!(to_site_url(&rewriter(""), "/content/"), "/");
    }

    #[test]
    fn test_paths_outside_root_are_unchanged() {
        let r = rewriter("");
        assert_eq!(to_site_url(&r, "/apps/site/page"), "/apps/site/page");
        assert_eq!(to_site_url(&r, "/contentious/page"), "/contentious/page");
    }

    #[test]
    fn test_failures_fall_back_to_path() {
        let r = rewriter("");
        assert!(r.transform("/content/../etc/passwd").is_err());
        assert_eq!(
            to_site_url(&r, "/content/../etc/passwd"),
            "/content/../etc/passwd"
        );
        assert_eq!(to_site_url(&r, "  "), "  ");
    }
}
