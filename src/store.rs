//! Access to the authoritative system of record.

pub mod memory;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::collation::Alphabet;
use crate::error::Result;
use crate::model::{Category, DictionaryEntry, Entity, EntityId, MediaKind, RecordKind};

pub use memory::{MemoryStore, StoreFixture};

/// Relations to load alongside a batch of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EagerLoad {
    /// Joined in the same lookup.
    pub select_related: Vec<&'static str>,
    /// Loaded with one follow-up lookup per relation.
    pub prefetch: Vec<&'static str>,
}

impl EagerLoad {
    /// Hints used when hydrating search hits of `kind`.
    pub fn for_hydration(kind: RecordKind) -> Self {
        match kind {
            RecordKind::DictionaryEntry => EagerLoad {
                select_related: vec!["site"],
                prefetch: vec![
                    "translations",
                    "related_audio",
                    "related_images",
                    "related_audio.original",
                    "related_audio.speakers",
                    "related_images.original",
                ],
            },
            RecordKind::Song | RecordKind::Story => EagerLoad {
                select_related: vec!["site"],
                prefetch: vec!["related_images", "related_images.original"],
            },
            RecordKind::Media(MediaKind::Audio) => EagerLoad {
                select_related: vec!["site"],
                prefetch: vec!["original", "speakers"],
            },
            RecordKind::Media(_) => EagerLoad {
                select_related: vec!["site"],
                prefetch: vec!["original"],
            },
            RecordKind::Language => EagerLoad {
                select_related: Vec::new(),
                prefetch: vec!["sites"],
            },
            RecordKind::Site => EagerLoad::default(),
        }
    }
}

pub type EntityStream<'a> = Box<dyn Iterator<Item = Result<Entity>> + 'a>;

/// Read and narrow write access to the relational store.
///
/// Implementations must be safe to share between request threads.
pub trait SystemOfRecord: Send + Sync {
    /// Point lookup.
    fn fetch(&self, kind: RecordKind, id: &str) -> Result<Option<Entity>>;

    /// Batched lookup. Missing ids are absent from the returned map.
    fn fetch_many(
        &self,
        kind: RecordKind,
        ids: &[EntityId],
        eager: &EagerLoad,
    ) -> Result<HashMap<EntityId, Entity>>;

    /// Iterate every record of `kind` without materializing them all.
    fn stream(&self, kind: RecordKind) -> Result<EntityStream<'_>>;

    /// Every content record owned by a site.
    fn site_records(&self, site_id: &str) -> Result<Vec<(RecordKind, EntityId)>>;

    fn category(&self, category_id: &str) -> Result<Option<Category>>;

    /// Direct children of a category.
    fn child_categories(&self, category_id: &str) -> Result<Vec<EntityId>>;

    fn alphabet(&self, site_id: &str) -> Result<Option<Alphabet>>;

    fn dictionary_entries(&self, site_id: &str) -> Result<Vec<DictionaryEntry>>;

    /// Store a recalculated title and order key. Bumps the system-modified
    /// timestamp and leaves the user-visible last-modified alone.
    fn save_collation(
        &self,
        entry_id: &str,
        cleaned_title: &str,
        order_key: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hydration_hints() {
        let hints = EagerLoad::for_hydration(RecordKind::DictionaryEntry);
        assert_eq!(hints.select_related, vec!["site"]);
        assert!(hints.prefetch.contains(&"translations"));
        assert!(
            EagerLoad::for_hydration(RecordKind::Media(MediaKind::Audio))
                .prefetch
                .contains(&"speakers")
        );
    }
}
