//! Contracts of the content repository collaborators.
//!
//! Sessions, query execution and hit reads are owned by the host
//! repository. The search pipeline only talks to these traits, so tests and
//! the bundled [`memory::MemoryRepository`] can stand in for a real one.

pub mod memory;

use axum::http::HeaderMap;

use crate::error::RepositoryResult;
use crate::models::ResultSet;
use crate::query::PredicateSpec;

/// Opaque, authenticated handle to the repository for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
        }
    }
}

/// Resolves the session for an inbound request.
pub trait SessionProvider: Send + Sync {
    fn session(&self, headers: &HeaderMap) -> RepositoryResult<Session>;
}

/// A prepared query, bound to the session it was created with.
pub trait Query {
    fn result(&self) -> RepositoryResult<ResultSet>;
}

/// Creates queries from predicate maps.
pub trait QueryEngine: Send + Sync {
    fn create_query<'a>(
        &'a self,
        spec: PredicateSpec,
        session: &'a Session,
    ) -> RepositoryResult<Box<dyn Query + 'a>>;
}
