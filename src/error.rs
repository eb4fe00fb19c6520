use thiserror::Error;

/// Why a search request was turned away before any predicate was built.
///
/// Rejections are not failures: the HTML endpoint answers with an empty
/// fragment and the JSON endpoint with `success: false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("query text is empty")]
    EmptyQuery,
    /// Leading or trailing `*` would turn the search into an unbounded scan.
    #[error("query text starts or ends with a wildcard")]
    Wildcard,
    #[error("search directory is required")]
    MissingScope,
}

/// Failures reported by the content repository collaborators.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to open repository session: {0}")]
    Session(String),

    #[error("query execution failed: {0}")]
    Query(String),

    #[error("failed to read hit at {path}: {reason}")]
    HitRead { path: String, reason: String },

    #[error("failed to rewrite {path}: {reason}")]
    Rewrite { path: String, reason: String },

    #[error("failed to load content fixture: {0}")]
    Fixture(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
