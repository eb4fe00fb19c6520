use std::sync::Arc;

use crate::config::Config;
use crate::repository::memory::MemoryRepository;
use crate::rewrite::ContextRootRewriter;
use crate::search::SearchService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub search: SearchService,
}

impl AppState {
    /// Wire the bundled in-memory repository and context-root rewriter.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let repo = Arc::new(MemoryRepository::load(&config.fixture_path, config.page_size)?);
        Ok(Self::with_repository(config, repo))
    }

    pub fn with_repository(config: Config, repo: Arc<MemoryRepository>) -> Self {
        let rewriter = Arc::new(ContextRootRewriter::new(config.rewrite.clone()));
        let search = SearchService::new(repo.clone(), repo, rewriter, &config.teaser_property);
        Self { config, search }
    }
}
