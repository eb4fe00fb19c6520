//! Translation of search parameters into query engine predicates.

pub mod builder;
pub mod escape;

pub use builder::{
    AlternateMatch, OffsetPolicy, PredicateSpec, QuerySpecBuilder, SearchProfile,
};
