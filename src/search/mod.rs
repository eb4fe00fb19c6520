//! Search orchestration shared by the HTML and JSON endpoints.

pub mod service;

pub use service::SearchService;
