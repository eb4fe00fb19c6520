use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::rewrite::RewriteConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// JSON file with the pages served by the in-memory repository
    pub fixture_path: PathBuf,
    /// Hits per result page
    pub page_size: usize,
    /// Page property shown as the teaser line in HTML results
    pub teaser_property: String,
    /// Repository path to public URL mapping
    pub rewrite: RewriteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4502".to_string(),
            fixture_path: PathBuf::from("./data/content.json"),
            page_size: 10,
            teaser_property: "pageTitle".to_string(),
            rewrite: RewriteConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("CONTENT_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(path) = std::env::var("CONTENT_SEARCH_FIXTURE") {
            config.fixture_path = PathBuf::from(path);
        }
        if let Ok(val) = std::env::var("CONTENT_SEARCH_PAGE_SIZE") {
            if let Ok(v) = val.parse::<usize>() {
                config.page_size = v.max(1);
            }
        }
        if let Ok(prop) = std::env::var("CONTENT_SEARCH_TEASER_PROPERTY") {
            config.teaser_property = prop;
        }

        // URL rewriting
        if let Ok(root) = std::env::var("CONTENT_SEARCH_CONTENT_ROOT") {
            config.rewrite.content_root = root;
        }
        if let Ok(prefix) = std::env::var("CONTENT_SEARCH_PUBLIC_PREFIX") {
            config.rewrite.public_prefix = prefix;
        }
        if let Ok(ext) = std::env::var("CONTENT_SEARCH_EXTENSION") {
            config.rewrite.extension = ext;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.teaser_property, "pageTitle");
        assert_eq!(config.rewrite.content_root, "/content");
        assert_eq!(config.rewrite.extension, ".html");
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bind_addr, "127.0.0.1:4502");
        assert_eq!(back.fixture_path, PathBuf::from("./data/content.json"));
    }
}
