//! Result renderers for the two search endpoints.

pub mod html;
pub mod json;

pub use html::HtmlRenderer;
pub use json::JsonRenderer;
