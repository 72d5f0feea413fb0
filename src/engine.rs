//! Search engine client boundary.
//!
//! The crate talks to the engine only through [`SearchEngine`]: document CRUD,
//! structured queries, index and alias administration, bulk ingestion and
//! refresh. [`MemoryEngine`] is the in-process implementation used by the CLI
//! and the tests; [`TimeoutEngine`] bounds every call of another engine.

pub mod guard;
pub mod memory;
pub mod query;

use serde::{Deserialize, Serialize};

use crate::data::IndexDocument;
use crate::error::Result;
use crate::schema::Schema;

pub use guard::TimeoutEngine;
pub use memory::MemoryEngine;
pub use query::{
    BooleanClause, BooleanQuery, EngineQuery, Occur, Query, RandomScore, SortClause, SortField,
    SortOrder, TermValue,
};

/// Settings for a new physical index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub schema: Schema,
    pub shards: u32,
    pub replicas: u32,
}

/// One step of an atomic alias update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

/// A ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Physical index that holds the document.
    pub index: String,
    /// Engine-side id.
    pub id: String,
    pub score: f32,
    pub source: IndexDocument,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
    /// Matches before paging.
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub indexed: usize,
}

/// Client for the search engine.
///
/// `target` arguments accept an alias or a physical index name. Write calls
/// through an alias require it to resolve to exactly one index.
/// Connectivity failures and timeouts surface as
/// [`crate::error::ArchiveError::EngineUnavailable`].
pub trait SearchEngine: Send + Sync {
    fn create_index(&self, name: &str, spec: &IndexSpec) -> Result<()>;

    /// Delete a physical index. Deleting a missing index is not an error.
    fn delete_index(&self, name: &str) -> Result<()>;

    fn index_exists(&self, name: &str) -> Result<bool>;

    /// Physical indices whose names start with `prefix`, sorted by name.
    fn indices_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Physical indices the alias points at, sorted by name.
    fn indices_for_alias(&self, alias: &str) -> Result<Vec<String>>;

    /// Apply every action or none of them.
    fn update_aliases(&self, actions: &[AliasAction]) -> Result<()>;

    /// Create or replace the document with `document.id`.
    fn put_document(&self, target: &str, document: IndexDocument) -> Result<()>;

    /// Merge `partial` into an existing document. Missing documents fail with
    /// [`crate::error::ArchiveError::DocumentNotFound`].
    fn update_document(&self, target: &str, id: &str, partial: IndexDocument) -> Result<()>;

    /// Missing documents fail with [`crate::error::ArchiveError::DocumentNotFound`].
    fn delete_document(&self, target: &str, id: &str) -> Result<()>;

    fn get_document(&self, target: &str, id: &str) -> Result<Option<IndexDocument>>;

    fn search(&self, request: &EngineQuery) -> Result<SearchResponse>;

    /// Index a batch into one physical index. Any rejected document fails the call.
    fn bulk(&self, index: &str, documents: Vec<IndexDocument>) -> Result<BulkResponse>;

    /// Make recent writes visible to search.
    fn refresh(&self, target: &str) -> Result<()>;
}
