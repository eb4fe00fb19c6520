//! # content-search
//!
//! Search over a CMS content repository. A free-text query and a directory
//! scope come in over HTTP, are turned into the predicate map the
//! repository's query engine understands, and the result page goes back
//! either as an HTML fragment or as JSON for a client-side UI.
//!
//! ## Pipeline
//!
//! ```text
//!   GET|POST q, dir, offset
//!            │
//!            ▼
//!   ┌──────────────────┐   blank or *wildcard*
//!   │ QuerySpecBuilder │ ─────────────────────► empty HTML / success:false
//!   └────────┬─────────┘
//!            │ PredicateSpec (html or json profile)
//!            ▼
//!   ┌──────────────────┐
//!   │   QueryEngine    │  session from SessionProvider
//!   └────────┬─────────┘
//!            │ ResultSet
//!      ┌─────┴──────┐
//!      ▼            ▼
//!   HtmlRenderer  JsonRenderer ── UrlRewriter per hit
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration
//! - [`error`] - Rejections and repository/search errors
//! - [`models`] - Request parameters, hits, result sets, JSON envelopes
//! - [`query`] - Predicate building and per-context escaping
//! - [`repository`] - Session and query engine contracts, plus an in-memory repository
//! - [`rewrite`] - Repository path to public URL mapping
//! - [`render`] - HTML fragment and JSON envelope renderers
//! - [`search`] - Per-request orchestration used by both endpoints
//! - [`api`] - Axum handlers and router
//! - [`state`] - Shared application state

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod render;
pub mod repository;
pub mod rewrite;
pub mod search;
pub mod state;
