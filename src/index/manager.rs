use std::sync::Arc;

use ahash::AHashMap;
use chrono::Utc;
use parking_lot::Mutex;
use rayon::prelude::*;
use uuid::Uuid;

use crate::collation::{Collator, site_alphabet};
use crate::config::{ArchiveConfig, IndexSettings};
use crate::data::IndexDocument;
use crate::engine::{AliasAction, EngineQuery, IndexSpec, Query, SearchEngine};
use crate::error::{ArchiveError, Result};
use crate::index::lease::{PendingWrite, RebuildLease, RebuildLeases};
use crate::index::outbox::{ChangeKind, EntityChange};
use crate::index::{IndexOutcome, RebuildReport};
use crate::model::{Entity, RecordKind, SiteId};
use crate::schema::fields::{DOCUMENT_ID, DOCUMENT_TYPE};
use crate::schema::{IndexKind, Schema, SchemaRegistry};
use crate::store::SystemOfRecord;

/// Keeps each alias consistent with the system of record.
///
/// Incremental writes swallow connectivity failures (logged) so that a store
/// commit never fails because the engine is down; a later rebuild repairs the
/// drift. Rebuild errors always propagate.
pub struct IndexManager {
    engine: Arc<dyn SearchEngine>,
    store: Arc<dyn SystemOfRecord>,
    registry: SchemaRegistry,
    settings: IndexSettings,
    shards: u32,
    replicas: u32,
    leases: RebuildLeases,
    /// Serializes creation of the first generation behind an alias.
    bootstrap: Mutex<()>,
}

impl IndexManager {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        store: Arc<dyn SystemOfRecord>,
        config: &ArchiveConfig,
    ) -> Self {
        IndexManager {
            engine,
            store,
            registry: SchemaRegistry::new(config.index.prefix.clone()),
            settings: config.index.clone(),
            shards: config.engine.shards,
            replicas: config.engine.replicas,
            leases: RebuildLeases::new(),
            bootstrap: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    pub fn is_rebuilding(&self, kind: IndexKind) -> bool {
        self.leases.is_held(&self.registry.alias(kind))
    }

    /// Write `entity` into the index behind its alias and refresh.
    pub fn add_to_index(&self, entity: &Entity) -> Result<IndexOutcome> {
        let result = self.try_add(entity);
        self.settle("add", entity.record_kind(), entity.id(), result)
    }

    /// Replace the fields of the existing index document for `entity`.
    pub fn update_in_index(&self, entity: &Entity) -> Result<IndexOutcome> {
        let result = self.try_update(entity);
        self.settle("update", entity.record_kind(), entity.id(), result)
    }

    pub fn remove_from_index(&self, entity: &Entity) -> Result<IndexOutcome> {
        self.remove_record(entity.record_kind(), entity.id())
    }

    /// Delete the index document for a record that may no longer exist in the store.
    pub fn remove_record(&self, kind: RecordKind, id: &str) -> Result<IndexOutcome> {
        let result = self.try_remove(kind, id);
        self.settle("remove", kind, id, result)
    }

    /// Re-read a record and add, update or remove its index document so the
    /// index matches the store.
    pub fn sync_in_index(&self, kind: RecordKind, id: &str) -> Result<IndexOutcome> {
        match self.store.fetch(kind, id)? {
            Some(entity) if self.registry.should_be_indexed(&entity) => self.add_to_index(&entity),
            Some(_) => match self.remove_record(kind, id)? {
                IndexOutcome::NotFound => Ok(IndexOutcome::Skipped),
                outcome => Ok(outcome),
            },
            None => self.remove_record(kind, id),
        }
    }

    /// Re-sync a site, its language and every record it owns after its
    /// visibility changed. Returns the number of owned records synced.
    pub fn propagate_site_visibility(&self, site_id: &str) -> Result<usize> {
        self.sync_in_index(RecordKind::Site, site_id)?;
        if let Some(Entity::Site(site)) = self.store.fetch(RecordKind::Site, site_id)? {
            if let Some(language_id) = &site.language_id {
                self.sync_in_index(RecordKind::Language, language_id)?;
            }
        }

        let records = self.store.site_records(site_id)?;
        for (kind, id) in &records {
            self.sync_in_index(*kind, id)?;
        }
        log::info!("Re-synced {} records of site {site_id}", records.len());
        Ok(records.len())
    }

    /// Apply one committed change from the outbox.
    pub fn apply_change(&self, change: &EntityChange) -> Result<IndexOutcome> {
        match change.change {
            ChangeKind::Upsert => self.sync_in_index(change.record, &change.id),
            ChangeKind::Delete => self.remove_record(change.record, &change.id),
            ChangeKind::SiteVisibility => {
                self.propagate_site_visibility(&change.id)?;
                Ok(IndexOutcome::Updated)
            }
        }
    }

    /// Rebuild the alias for `kind` from a full scan of the store.
    ///
    /// The alias keeps serving the current generation until the new one is
    /// complete. Records written meanwhile are replayed into the new
    /// generation before the alias moves. On failure the new generation is
    /// deleted and the alias is left as it was.
    pub fn rebuild(&self, kind: IndexKind) -> Result<RebuildReport> {
        let alias = self.registry.alias(kind);
        let lease = self
            .leases
            .acquire(&alias, self.settings.rebuild_lease_timeout())?;
        let started_at = Utc::now();

        let generation = generation_name(&alias);
        log::info!("Rebuilding {alias} into {generation}");
        self.engine
            .create_index(&generation, &self.index_spec(kind))
            .map_err(|e| ArchiveError::rebuild(&alias, format!("could not create {generation}: {e}")))?;

        let (indexed, replayed, previous) =
            match self.fill_and_cut_over(kind, &alias, &generation, &lease) {
                Ok(done) => done,
                Err(e) => {
                    log::error!("Rebuild of {alias} failed, alias left unchanged: {e}");
                    if let Err(cleanup) = self.engine.delete_index(&generation) {
                        log::error!("Could not delete abandoned generation {generation}: {cleanup}");
                    }
                    return Err(match e {
                        ArchiveError::RebuildFailure { .. } => e,
                        other => ArchiveError::rebuild(&alias, other.to_string()),
                    });
                }
            };
        let deleted = self.prune_generations(&alias, &generation);
        drop(lease);

        let finished_at = Utc::now();
        log::info!(
            "Rebuilt {alias}: {indexed} documents, {replayed} replayed, {} old generations deleted in {}ms",
            deleted.len(),
            (finished_at - started_at).num_milliseconds()
        );

        Ok(RebuildReport {
            kind,
            alias,
            generation,
            previous,
            indexed,
            replayed,
            deleted,
            started_at,
            finished_at,
        })
    }

    /// Rebuild every alias in turn, stopping at the first failure.
    pub fn rebuild_all(&self) -> Result<Vec<RebuildReport>> {
        IndexKind::ALL
            .into_iter()
            .map(|kind| self.rebuild(kind))
            .collect()
    }

    /// Make sure the alias for `kind` points at a generation, creating the
    /// first one when needed.
    pub fn ensure_alias(&self, kind: IndexKind) -> Result<String> {
        let alias = self.registry.alias(kind);
        let _guard = self.bootstrap.lock();
        if self.engine.indices_for_alias(&alias)?.is_empty() {
            let generation = generation_name(&alias);
            self.engine.create_index(&generation, &self.index_spec(kind))?;
            self.engine.update_aliases(&[AliasAction::Add {
                index: generation.clone(),
                alias: alias.clone(),
            }])?;
            log::info!("Created {generation} behind new alias {alias}");
        }
        Ok(alias)
    }

    fn index_spec(&self, kind: IndexKind) -> IndexSpec {
        IndexSpec {
            schema: Schema::for_kind(kind),
            shards: self.shards,
            replicas: self.replicas,
        }
    }

    fn settle(
        &self,
        action: &str,
        kind: RecordKind,
        id: &str,
        result: Result<IndexOutcome>,
    ) -> Result<IndexOutcome> {
        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_unavailable() => {
                log::error!("Could not {action} {kind} {id} in the index: {e}");
                Ok(IndexOutcome::Unavailable)
            }
            Err(e) if e.is_not_found() => {
                log::warn!("Could not {action} {kind} {id}: no matching index document");
                Ok(IndexOutcome::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    fn try_add(&self, entity: &Entity) -> Result<IndexOutcome> {
        let kind = self.registry.index_kind(entity);
        let alias = self.ensure_alias(kind)?;
        self.leases.record(&alias, entity.record_kind(), entity.id());

        let document = self.document(entity)?;
        self.engine.put_document(&alias, document)?;
        self.engine.refresh(&alias)?;
        Ok(IndexOutcome::Indexed)
    }

    fn try_update(&self, entity: &Entity) -> Result<IndexOutcome> {
        let alias = self.registry.alias(self.registry.index_kind(entity));
        self.leases.record(&alias, entity.record_kind(), entity.id());

        let ids = self.lookup(&alias, entity.record_kind(), entity.id())?;
        if ids.is_empty() {
            return Ok(self.not_found("update", entity.record_kind(), entity.id()));
        }

        let mut partial = self.document(entity)?;
        partial.id = None;
        for id in &ids {
            self.engine.update_document(&alias, id, partial.clone())?;
        }
        self.engine.refresh(&alias)?;
        Ok(IndexOutcome::Updated)
    }

    fn try_remove(&self, kind: RecordKind, id: &str) -> Result<IndexOutcome> {
        let alias = self.registry.alias(IndexKind::for_record(kind));
        self.leases.record(&alias, kind, id);

        let ids = self.lookup(&alias, kind, id)?;
        if ids.is_empty() {
            return Ok(self.not_found("remove", kind, id));
        }
        for engine_id in &ids {
            self.engine.delete_document(&alias, engine_id)?;
        }
        self.engine.refresh(&alias)?;
        Ok(IndexOutcome::Removed)
    }

    /// Collator for a site's alphabet, or `None` when the alphabet does not
    /// compile; entries of that site are then indexed as stored.
    fn collator(&self, site_id: &str) -> Result<Option<Collator>> {
        let alphabet = site_alphabet(self.store.as_ref(), site_id)?;
        match Collator::new(&alphabet) {
            Ok(collator) => Ok(Some(collator)),
            Err(e) => {
                log::warn!("Alphabet of site {site_id} is unusable, indexing stored order keys: {e}");
                Ok(None)
            }
        }
    }

    /// Index document for `entity`. A dictionary entry is indexed with the
    /// title and order key its site alphabet gives it now, so a saved title
    /// is never searched under a stale key.
    fn to_document(&self, entity: &Entity, collator: Option<&Collator>) -> IndexDocument {
        match (entity, collator) {
            (Entity::DictionaryEntry(entry), Some(collator)) => {
                let mut entry = entry.clone();
                collator.apply(&mut entry);
                self.registry.to_document(&Entity::DictionaryEntry(entry))
            }
            _ => self.registry.to_document(entity),
        }
    }

    fn document(&self, entity: &Entity) -> Result<IndexDocument> {
        let collator = match entity {
            Entity::DictionaryEntry(entry) => self.collator(&entry.meta.site.id)?,
            _ => None,
        };
        Ok(self.to_document(entity, collator.as_ref()))
    }

    fn not_found(&self, action: &str, kind: RecordKind, id: &str) -> IndexOutcome {
        log::warn!("Could not {action} {kind} {id}: no matching index document");
        IndexOutcome::NotFound
    }

    /// Engine ids of the documents whose `document_id` is `id`.
    fn lookup(&self, alias: &str, kind: RecordKind, id: &str) -> Result<Vec<String>> {
        let request = EngineQuery {
            indices: vec![alias.to_string()],
            query: Query::all_of([
                Query::term(DOCUMENT_ID, id),
                Query::term(DOCUMENT_TYPE, kind.to_string()),
            ]),
            sort: Vec::new(),
            from: 0,
            size: 10,
        };
        Ok(self
            .engine
            .search(&request)?
            .hits
            .into_iter()
            .map(|hit| hit.id)
            .collect())
    }

    fn fill_and_cut_over(
        &self,
        kind: IndexKind,
        alias: &str,
        generation: &str,
        lease: &RebuildLease<'_>,
    ) -> Result<(usize, usize, Vec<String>)> {
        let indexed = self.ingest(kind, generation)?;
        let mut replayed = self.replay(generation, lease.drain())?;
        self.engine.refresh(generation)?;

        let (late, previous) = lease.cut_over(|pending| {
            let late = self.replay(generation, pending)?;
            self.engine.refresh(generation)?;

            let previous = self.engine.indices_for_alias(alias)?;
            let mut actions: Vec<AliasAction> = previous
                .iter()
                .map(|index| AliasAction::Remove {
                    index: index.clone(),
                    alias: alias.to_string(),
                })
                .collect();
            actions.push(AliasAction::Add {
                index: generation.to_string(),
                alias: alias.to_string(),
            });
            self.engine.update_aliases(&actions)?;
            Ok((late, previous))
        })?;
        replayed += late;

        Ok((indexed, replayed, previous))
    }

    /// Stream every bound model into `generation`, one bulk request per chunk.
    fn ingest(&self, kind: IndexKind, generation: &str) -> Result<usize> {
        let chunk_size = self.settings.bulk_chunk_size.max(1);
        let mut chunk: Vec<Entity> = Vec::with_capacity(chunk_size);
        let mut collators: AHashMap<SiteId, Option<Collator>> = AHashMap::new();
        let mut indexed = 0;

        for record in kind.record_kinds() {
            for entity in self.store.stream(*record)? {
                let entity = entity?;
                if !self.registry.should_be_indexed(&entity) {
                    continue;
                }
                if let Entity::DictionaryEntry(entry) = &entity {
                    let site_id = &entry.meta.site.id;
                    if !collators.contains_key(site_id) {
                        collators.insert(site_id.clone(), self.collator(site_id)?);
                    }
                }
                chunk.push(entity);
                if chunk.len() >= chunk_size {
                    indexed += self.flush_chunk(generation, &mut chunk, &collators)?;
                }
            }
        }
        indexed += self.flush_chunk(generation, &mut chunk, &collators)?;
        Ok(indexed)
    }

    fn flush_chunk(
        &self,
        generation: &str,
        chunk: &mut Vec<Entity>,
        collators: &AHashMap<SiteId, Option<Collator>>,
    ) -> Result<usize> {
        if chunk.is_empty() {
            return Ok(0);
        }
        let documents: Vec<IndexDocument> = chunk
            .par_iter()
            .map(|entity| {
                let collator = entity
                    .site_id()
                    .and_then(|site_id| collators.get(site_id))
                    .and_then(Option::as_ref);
                self.to_document(entity, collator)
            })
            .collect();
        chunk.clear();
        Ok(self.engine.bulk(generation, documents)?.indexed)
    }

    /// Bring `generation` up to date with the store for each pending write.
    fn replay(&self, generation: &str, writes: Vec<PendingWrite>) -> Result<usize> {
        let count = writes.len();
        for write in writes {
            match self.store.fetch(write.kind, &write.id)? {
                Some(entity) if self.registry.should_be_indexed(&entity) => {
                    self.engine.put_document(generation, self.document(&entity)?)?;
                }
                _ => {
                    let engine_id = self.registry.engine_id(write.kind, &write.id);
                    match self.engine.delete_document(generation, &engine_id) {
                        Ok(()) => {}
                        Err(e) if e.is_not_found() => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(count)
    }

    /// Delete superseded generations beyond the retention count. Called with
    /// the rebuild lease held; indices the alias points at are never deleted.
    /// Failures are logged; the cutover has already happened.
    fn prune_generations(&self, alias: &str, current: &str) -> Vec<String> {
        let listed = self
            .engine
            .indices_with_prefix(&format!("{alias}_"))
            .and_then(|names| Ok((names, self.engine.indices_for_alias(alias)?)));
        let (mut old, live) = match listed {
            Ok(listed) => listed,
            Err(e) => {
                log::error!("Could not list generations of {alias}: {e}");
                return Vec::new();
            }
        };
        old.retain(|name| name != current && !live.contains(name));
        old.sort();

        let excess = old.len().saturating_sub(self.settings.retain_generations);
        let mut deleted = Vec::with_capacity(excess);
        for name in old.into_iter().take(excess) {
            match self.engine.delete_index(&name) {
                Ok(()) => deleted.push(name),
                Err(e) => log::error!("Could not delete old generation {name}: {e}"),
            }
        }
        deleted
    }
}

/// `{alias}_{timestamp}_{suffix}`; names of one alias sort chronologically.
fn generation_name(alias: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{alias}_{}_{}",
        Utc::now().format("%Y%m%d%H%M%S%3f"),
        &suffix[..8]
    )
}
