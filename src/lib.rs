//! # archive-search
//!
//! Search layer for a multi-tenant archive of language content.
//!
//! ## Features
//!
//! - Alphabet-aware collation: confusable cleanup, grapheme tokenization and
//!   order keys that sort by a site's own alphabet
//! - One alias per indexed kind, rebuilt into a fresh generation and swapped
//!   atomically
//! - Incremental index writes that never fail a store commit
//! - A validated, immutable search request compiled into one engine query
//! - Hydration of ranked hits back into authoritative records
pub mod collation;
pub mod config;
pub mod data;
pub mod engine;
mod error;
pub mod hydrate;
pub mod index;
pub mod model;
pub mod policy;
pub mod schema;
pub mod search;
pub mod service;
pub mod store;

// Re-exports for the public API
pub use collation::{Alphabet, Collation, Collator, RecalculationMode, RecalculationReport, collate};
pub use config::ArchiveConfig;
pub use data::{FieldValue, IndexDocument};
pub use engine::{MemoryEngine, SearchEngine, TimeoutEngine};
pub use error::{ArchiveError, Result};
pub use hydrate::{Hydrator, SearchResult};
pub use index::{EntityChange, IndexManager, IndexOutcome, RebuildReport};
pub use model::{Entity, RecordKind, TypeTag, Visibility};
pub use policy::{MembershipPolicy, Principal, VisibilityPolicy, VisibilityScope};
pub use schema::{IndexKind, SchemaRegistry};
pub use search::{QueryCompiler, RawSearchParams, SearchRequest, SearchRequestBuilder};
pub use service::{SearchPage, SearchService};
pub use store::{MemoryStore, SystemOfRecord};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
