//! Turns ranked engine hits back into authoritative records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::Hit;
use crate::error::Result;
use crate::model::{Entity, EntityId, RecordKind, TypeTag};
use crate::policy::VisibilityScope;
use crate::schema::SchemaRegistry;
use crate::schema::fields::{DOCUMENT_ID, DOCUMENT_TYPE};
use crate::store::{EagerLoad, SystemOfRecord};

/// One hydrated hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Engine-side id of the hit.
    pub search_result_id: String,
    pub score: f32,
    /// `None` for language-index records.
    #[serde(rename = "type")]
    pub type_tag: Option<TypeTag>,
    pub entry: Entity,
}

pub struct Hydrator<'a> {
    store: &'a dyn SystemOfRecord,
    registry: &'a SchemaRegistry,
}

impl<'a> Hydrator<'a> {
    pub fn new(store: &'a dyn SystemOfRecord, registry: &'a SchemaRegistry) -> Self {
        Hydrator { store, registry }
    }

    /// Load the records behind `hits` with one batched lookup per record
    /// kind and return them in hit order.
    ///
    /// Hits whose record is gone from the store are skipped with a warning,
    /// as are records the caller may no longer see.
    pub fn hydrate(&self, hits: &[Hit], scope: &VisibilityScope) -> Result<Vec<SearchResult>> {
        let mut keyed: Vec<Option<(RecordKind, &str)>> = Vec::with_capacity(hits.len());
        let mut ids_by_kind: BTreeMap<RecordKind, Vec<EntityId>> = BTreeMap::new();

        for hit in hits {
            let key = hit_key(hit);
            if let Some((kind, id)) = key {
                let ids = ids_by_kind.entry(kind).or_default();
                if !ids.iter().any(|existing| existing == id) {
                    ids.push(id.to_string());
                }
            } else {
                log::warn!("Hit {} in {} has no usable document type or id", hit.id, hit.index);
            }
            keyed.push(key);
        }

        let mut loaded = BTreeMap::new();
        for (kind, ids) in &ids_by_kind {
            let records = self
                .store
                .fetch_many(*kind, ids, &EagerLoad::for_hydration(*kind))?;
            loaded.insert(*kind, records);
        }

        let mut results = Vec::with_capacity(hits.len());
        for (hit, key) in hits.iter().zip(keyed) {
            let Some((kind, id)) = key else {
                continue;
            };
            let Some(entity) = loaded.get(&kind).and_then(|records| records.get(id)) else {
                log::warn!("{kind} {id} is indexed but missing from the store; skipping");
                continue;
            };
            if !scope.allows_entity(entity) {
                log::debug!("Dropping {kind} {id}: no longer visible to the caller");
                continue;
            }
            results.push(SearchResult {
                search_result_id: hit.id.clone(),
                score: hit.score,
                type_tag: self.registry.type_tag(entity),
                entry: entity.clone(),
            });
        }
        Ok(results)
    }
}

fn hit_key(hit: &Hit) -> Option<(RecordKind, &str)> {
    let kind = hit.source.text(DOCUMENT_TYPE)?.parse::<RecordKind>().ok()?;
    let id = hit.source.text(DOCUMENT_ID)?;
    Some((kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IndexDocument;
    use crate::store::MemoryStore;

    fn hit(kind: &str, id: &str) -> Hit {
        Hit {
            index: "idx".into(),
            id: format!("{kind}:{id}"),
            score: 1.0,
            source: IndexDocument::builder()
                .add_keyword(DOCUMENT_TYPE, kind)
                .add_keyword(DOCUMENT_ID, id)
                .build(),
        }
    }

    #[test]
    fn test_unparseable_hits_are_skipped() {
        let store = MemoryStore::new();
        let registry = SchemaRegistry::default();
        let mut bad = hit("poem", "1");
        bad.source = IndexDocument::new();
        let results = Hydrator::new(&store, &registry)
            .hydrate(&[bad, hit("poem", "2")], &VisibilityScope::admin())
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(store.batch_lookups(), 0);
    }

    #[test]
    fn test_missing_records_are_skipped() {
        let store = MemoryStore::new();
        let registry = SchemaRegistry::default();
        let results = Hydrator::new(&store, &registry)
            .hydrate(&[hit("song", "1"), hit("image", "2")], &VisibilityScope::admin())
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(store.batch_lookups(), 2);
    }
}
