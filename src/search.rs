//! Request validation and query compilation.
//!
//! Raw parameters become an immutable [`SearchRequest`] once, in
//! [`SearchRequestBuilder::build`]; [`QueryCompiler`] then turns that request
//! into a single [`crate::engine::EngineQuery`] or reports that it cannot
//! match anything.

pub mod compiler;
pub mod filters;
pub mod params;
pub mod request;
pub mod sort;
pub mod text;

pub use compiler::{CompiledSearch, QueryCompiler};
pub use params::{Domain, RawSearchParams, Selection, SortMode};
pub use request::{EmptyReason, PresenceFilters, SearchRequest, SearchRequestBuilder};
