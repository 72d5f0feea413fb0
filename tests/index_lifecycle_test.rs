mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use archive_search::collation::Alphabet;
use archive_search::IndexDocument;
use archive_search::engine::{
    AliasAction, BulkResponse, EngineQuery, IndexSpec, Query, SearchEngine, SearchResponse,
};
use archive_search::schema::fields::DOCUMENT_TYPE;
use archive_search::index::IndexOutcome;
use archive_search::model::{Category, DictionaryEntry, EntityId};
use archive_search::store::{EagerLoad, EntityStream};
use archive_search::{
    ArchiveConfig, ArchiveError, Entity, IndexKind, IndexManager, MemoryEngine, MemoryStore,
    RecordKind, SystemOfRecord, Visibility,
};

use common::{site, song, word};

type Hook = Box<dyn FnOnce() + Send>;

/// Delegates to a [`MemoryStore`] and runs a hook once the n-th streamed
/// record of a scan has been handed out.
struct HookStore {
    inner: Arc<MemoryStore>,
    hook: Mutex<Option<(usize, Hook)>>,
}

impl HookStore {
    fn new(inner: Arc<MemoryStore>) -> Self {
        HookStore {
            inner,
            hook: Mutex::new(None),
        }
    }

    fn on_first_streamed(&self, hook: impl FnOnce() + Send + 'static) {
        self.on_streamed(1, hook);
    }

    fn on_streamed(&self, nth: usize, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock() = Some((nth, Box::new(hook)));
    }
}

impl SystemOfRecord for HookStore {
    fn fetch(&self, kind: RecordKind, id: &str) -> archive_search::Result<Option<Entity>> {
        self.inner.fetch(kind, id)
    }

    fn fetch_many(
        &self,
        kind: RecordKind,
        ids: &[EntityId],
        eager: &EagerLoad,
    ) -> archive_search::Result<HashMap<EntityId, Entity>> {
        self.inner.fetch_many(kind, ids, eager)
    }

    fn stream(&self, kind: RecordKind) -> archive_search::Result<EntityStream<'_>> {
        let mut streamed = 0;
        let inner = self.inner.stream(kind)?;
        Ok(Box::new(inner.inspect(move |_| {
            streamed += 1;
            let hook = {
                let mut slot = self.hook.lock();
                match slot.as_ref() {
                    Some((nth, _)) if *nth == streamed => slot.take(),
                    _ => None,
                }
            };
            if let Some((_, hook)) = hook {
                hook();
            }
        })))
    }

    fn site_records(&self, site_id: &str) -> archive_search::Result<Vec<(RecordKind, EntityId)>> {
        self.inner.site_records(site_id)
    }

    fn category(&self, category_id: &str) -> archive_search::Result<Option<Category>> {
        self.inner.category(category_id)
    }

    fn child_categories(&self, category_id: &str) -> archive_search::Result<Vec<EntityId>> {
        self.inner.child_categories(category_id)
    }

    fn alphabet(&self, site_id: &str) -> archive_search::Result<Option<Alphabet>> {
        self.inner.alphabet(site_id)
    }

    fn dictionary_entries(&self, site_id: &str) -> archive_search::Result<Vec<DictionaryEntry>> {
        self.inner.dictionary_entries(site_id)
    }

    fn save_collation(
        &self,
        entry_id: &str,
        cleaned_title: &str,
        order_key: &str,
        at: DateTime<Utc>,
    ) -> archive_search::Result<()> {
        self.inner.save_collation(entry_id, cleaned_title, order_key, at)
    }
}

/// Delegates to a [`MemoryEngine`] and runs a hook on the first listing of
/// generations by prefix, which a rebuild does while pruning.
struct PruneHookEngine {
    inner: Arc<MemoryEngine>,
    hook: Mutex<Option<Hook>>,
}

impl PruneHookEngine {
    fn new(inner: Arc<MemoryEngine>) -> Self {
        PruneHookEngine {
            inner,
            hook: Mutex::new(None),
        }
    }

    fn on_first_listing(&self, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }
}

impl SearchEngine for PruneHookEngine {
    fn create_index(&self, name: &str, spec: &IndexSpec) -> archive_search::Result<()> {
        self.inner.create_index(name, spec)
    }

    fn delete_index(&self, name: &str) -> archive_search::Result<()> {
        self.inner.delete_index(name)
    }

    fn index_exists(&self, name: &str) -> archive_search::Result<bool> {
        self.inner.index_exists(name)
    }

    fn indices_with_prefix(&self, prefix: &str) -> archive_search::Result<Vec<String>> {
        let hook = self.hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        self.inner.indices_with_prefix(prefix)
    }

    fn indices_for_alias(&self, alias: &str) -> archive_search::Result<Vec<String>> {
        self.inner.indices_for_alias(alias)
    }

    fn update_aliases(&self, actions: &[AliasAction]) -> archive_search::Result<()> {
        self.inner.update_aliases(actions)
    }

    fn put_document(&self, target: &str, document: IndexDocument) -> archive_search::Result<()> {
        self.inner.put_document(target, document)
    }

    fn update_document(
        &self,
        target: &str,
        id: &str,
        partial: IndexDocument,
    ) -> archive_search::Result<()> {
        self.inner.update_document(target, id, partial)
    }

    fn delete_document(&self, target: &str, id: &str) -> archive_search::Result<()> {
        self.inner.delete_document(target, id)
    }

    fn get_document(&self, target: &str, id: &str) -> archive_search::Result<Option<IndexDocument>> {
        self.inner.get_document(target, id)
    }

    fn search(&self, request: &EngineQuery) -> archive_search::Result<SearchResponse> {
        self.inner.search(request)
    }

    fn bulk(
        &self,
        index: &str,
        documents: Vec<IndexDocument>,
    ) -> archive_search::Result<BulkResponse> {
        self.inner.bulk(index, documents)
    }

    fn refresh(&self, target: &str) -> archive_search::Result<()> {
        self.inner.refresh(target)
    }
}

fn titles(engine: &MemoryEngine, alias: &str) -> Vec<String> {
    let mut titles: Vec<String> = engine
        .documents(alias)
        .iter()
        .filter_map(|d| d.text("title").map(str::to_string))
        .collect();
    titles.sort();
    titles
}

#[test]
fn test_rebuild_failure_leaves_alias_untouched() -> archive_search::Result<()> {
    // 1. Seed three words and build the first generation
    let engine = Arc::new(MemoryEngine::new());
    let store = Arc::new(MemoryStore::new());
    let s1 = site("s1", Visibility::Public);
    for (id, title) in [("1", "one"), ("2", "two"), ("3", "three")] {
        store.upsert(Entity::DictionaryEntry(word(id, &s1, title, "")));
    }
    let config = ArchiveConfig::builder().bulk_chunk_size(2).build();
    let manager = IndexManager::new(engine.clone(), store.clone(), &config);

    let first = manager.rebuild(IndexKind::DictionaryEntry)?;
    assert_eq!(first.indexed, 3);
    let alias = first.alias.clone();
    assert_eq!(engine.indices_for_alias(&alias)?, vec![first.generation.clone()]);

    // 2. Grow the store, then make the second bulk chunk fail
    for (id, title) in [("4", "four"), ("5", "five")] {
        store.upsert(Entity::DictionaryEntry(word(id, &s1, title, "")));
    }
    engine.fail_bulk_after(Some(3));

    let result = manager.rebuild(IndexKind::DictionaryEntry);
    assert!(matches!(result, Err(ArchiveError::RebuildFailure { .. })));

    // 3. The alias still serves the complete old generation
    assert_eq!(engine.indices_for_alias(&alias)?, vec![first.generation.clone()]);
    assert_eq!(engine.index_names(), vec![first.generation]);
    assert_eq!(titles(&engine, &alias), vec!["one", "three", "two"]);
    assert!(!manager.is_rebuilding(IndexKind::DictionaryEntry));

    // 4. A later rebuild succeeds and prunes the old generation
    engine.fail_bulk_after(None);
    let second = manager.rebuild(IndexKind::DictionaryEntry)?;
    assert_eq!(second.indexed, 5);
    assert_eq!(second.deleted.len(), 1);
    assert_eq!(engine.index_names(), vec![second.generation]);

    Ok(())
}

#[test]
fn test_writes_during_rebuild_survive_cutover() -> archive_search::Result<()> {
    // 1. Build the first generation with two songs
    let engine = Arc::new(MemoryEngine::new());
    let inner = Arc::new(MemoryStore::new());
    let s1 = site("s1", Visibility::Public);
    inner.upsert(Entity::Song(song("1", &s1, "morning song")));
    inner.upsert(Entity::Song(song("2", &s1, "river song")));

    let store = Arc::new(HookStore::new(inner.clone()));
    let manager = Arc::new(IndexManager::new(
        engine.clone(),
        store.clone(),
        &ArchiveConfig::default(),
    ));
    manager.rebuild(IndexKind::Song)?;
    let alias = manager.registry().alias(IndexKind::Song);

    // 2. While the next rebuild streams, create one song and edit another
    let writer = Arc::clone(&manager);
    let writes = Arc::clone(&inner);
    let site_for_hook = s1.clone();
    store.on_first_streamed(move || {
        let created = Entity::Song(song("3", &site_for_hook, "new song"));
        writes.upsert(created.clone());
        assert_eq!(writer.add_to_index(&created).unwrap(), IndexOutcome::Indexed);

        let edited = Entity::Song(song("1", &site_for_hook, "evening song"));
        writes.upsert(edited.clone());
        assert_eq!(writer.update_in_index(&edited).unwrap(), IndexOutcome::Updated);
    });

    let report = manager.rebuild(IndexKind::Song)?;

    // 3. Both writes are visible through the alias after cutover
    assert_eq!(report.replayed, 2);
    assert_eq!(
        titles(&engine, &alias),
        vec!["evening song", "new song", "river song"]
    );
    assert_eq!(engine.indices_for_alias(&alias)?, vec![report.generation]);

    Ok(())
}

#[test]
fn test_readers_see_the_old_generation_during_rebuild() -> archive_search::Result<()> {
    // 1. Index two songs, then change the store without touching the index
    let engine = Arc::new(MemoryEngine::new());
    let inner = Arc::new(MemoryStore::new());
    let s1 = site("s1", Visibility::Public);
    inner.upsert(Entity::Song(song("1", &s1, "morning song")));
    inner.upsert(Entity::Song(song("2", &s1, "river song")));

    let store = Arc::new(HookStore::new(inner.clone()));
    let config = ArchiveConfig::builder().bulk_chunk_size(1).build();
    let manager = IndexManager::new(engine.clone(), store.clone(), &config);
    let first = manager.rebuild(IndexKind::Song)?;
    let alias = first.alias.clone();

    inner.upsert(Entity::Song(song("1", &s1, "evening song")));
    inner.upsert(Entity::Song(song("3", &s1, "new song")));

    // 2. Search the alias once two records are already in the new generation
    let reader = Arc::clone(&engine);
    let alias_in_hook = alias.clone();
    let old_generation = first.generation.clone();
    let seen = Arc::new(Mutex::new(None));
    let seen_in_hook = Arc::clone(&seen);
    store.on_streamed(3, move || {
        let request = EngineQuery {
            indices: vec![alias_in_hook.clone()],
            query: Query::term(DOCUMENT_TYPE, RecordKind::Song.to_string()),
            sort: Vec::new(),
            from: 0,
            size: 10,
        };
        let response = reader.search(&request).unwrap();
        let mut hits: Vec<(String, String)> = response
            .hits
            .iter()
            .map(|hit| {
                let title = hit.source.text("title").unwrap_or_default().to_string();
                (hit.index.clone(), title)
            })
            .collect();
        hits.sort();

        let filling: usize = reader
            .index_names()
            .iter()
            .filter(|name| **name != old_generation)
            .map(|name| reader.doc_count(name))
            .sum();
        *seen_in_hook.lock() = Some((hits, filling));
    });

    let second = manager.rebuild(IndexKind::Song)?;

    // 3. Mid-ingest, every hit came from the old generation
    let (hits, filling) = seen.lock().take().unwrap();
    assert_eq!(
        hits,
        vec![
            (first.generation.clone(), "morning song".to_string()),
            (first.generation.clone(), "river song".to_string()),
        ]
    );
    assert_eq!(filling, 2);

    // 4. After cutover, every hit comes from the new one
    assert_eq!(second.indexed, 3);
    assert_eq!(
        titles(&engine, &alias),
        vec!["evening song", "new song", "river song"]
    );

    Ok(())
}

#[test]
fn test_rebuild_started_during_prune_cannot_orphan_the_alias() -> archive_search::Result<()> {
    // 1. Two songs behind a first generation
    let memory = Arc::new(MemoryEngine::new());
    let engine = Arc::new(PruneHookEngine::new(memory.clone()));
    let store = Arc::new(MemoryStore::new());
    let s1 = site("s1", Visibility::Public);
    store.upsert(Entity::Song(song("1", &s1, "one")));
    store.upsert(Entity::Song(song("2", &s1, "two")));
    let manager = Arc::new(IndexManager::new(
        engine.clone(),
        store.clone(),
        &ArchiveConfig::default(),
    ));
    manager.rebuild(IndexKind::Song)?;
    let alias = manager.registry().alias(IndexKind::Song);

    // 2. A second rebuild starts while the next one is pruning
    let contender = Arc::clone(&manager);
    let seen = Arc::new(Mutex::new(None));
    let seen_in_hook = Arc::clone(&seen);
    engine.on_first_listing(move || {
        let result = contender.rebuild(IndexKind::Song);
        *seen_in_hook.lock() = Some(matches!(result, Err(ArchiveError::RebuildInProgress(_))));
    });

    let report = manager.rebuild(IndexKind::Song)?;

    // 3. The contender was turned away and the alias still serves documents
    assert_eq!(*seen.lock(), Some(true));
    assert!(!report.deleted.contains(&report.generation));
    assert_eq!(memory.indices_for_alias(&alias)?, vec![report.generation.clone()]);
    assert_eq!(memory.doc_count(&alias), 2);
    assert_eq!(memory.index_names(), vec![report.generation.clone()]);

    // 4. Once the lease is released, the next rebuild goes through
    let next = manager.rebuild(IndexKind::Song)?;
    assert_eq!(next.deleted, vec![report.generation]);
    assert_eq!(memory.doc_count(&alias), 2);

    Ok(())
}

#[test]
fn test_failed_index_creation_is_a_rebuild_failure() -> archive_search::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let store = Arc::new(MemoryStore::new());
    let manager = IndexManager::new(engine.clone(), store.clone(), &ArchiveConfig::default());

    engine.set_available(false);
    let result = manager.rebuild(IndexKind::Story);
    assert!(matches!(result, Err(ArchiveError::RebuildFailure { .. })));
    assert!(!manager.is_rebuilding(IndexKind::Story));

    engine.set_available(true);
    assert!(engine.index_names().is_empty());
    assert_eq!(manager.rebuild(IndexKind::Story)?.indexed, 0);

    Ok(())
}

#[test]
fn test_concurrent_rebuild_is_rejected() -> archive_search::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let inner = Arc::new(MemoryStore::new());
    let s1 = site("s1", Visibility::Public);
    inner.upsert(Entity::Song(song("1", &s1, "song")));

    let store = Arc::new(HookStore::new(inner));
    let manager = Arc::new(IndexManager::new(
        engine.clone(),
        store.clone(),
        &ArchiveConfig::default(),
    ));

    let contender = Arc::clone(&manager);
    let seen = Arc::new(Mutex::new(None));
    let seen_in_hook = Arc::clone(&seen);
    store.on_first_streamed(move || {
        assert!(contender.is_rebuilding(IndexKind::Song));
        let result = contender.rebuild(IndexKind::Song);
        *seen_in_hook.lock() = Some(matches!(result, Err(ArchiveError::RebuildInProgress(_))));
    });

    manager.rebuild(IndexKind::Song)?;
    assert_eq!(*seen.lock(), Some(true));
    // The rejected rebuild created nothing.
    assert_eq!(engine.index_names().len(), 1);

    Ok(())
}

#[test]
fn test_add_is_idempotent_under_retries() -> archive_search::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let store = Arc::new(MemoryStore::new());
    let manager = IndexManager::new(engine.clone(), store.clone(), &ArchiveConfig::default());
    let s1 = site("s1", Visibility::Public);
    let entity = Entity::DictionaryEntry(word("7", &s1, "bird", ""));
    store.upsert(entity.clone());

    // A lost connection is swallowed, not raised.
    engine.set_available(false);
    assert_eq!(manager.add_to_index(&entity)?, IndexOutcome::Unavailable);

    engine.set_available(true);
    for _ in 0..3 {
        assert_eq!(manager.add_to_index(&entity)?, IndexOutcome::Indexed);
    }

    let alias = manager.registry().alias(IndexKind::DictionaryEntry);
    assert_eq!(engine.doc_count(&alias), 1);

    Ok(())
}

#[test]
fn test_concurrent_adds_leave_one_document() -> archive_search::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let store = Arc::new(MemoryStore::new());
    let manager = Arc::new(IndexManager::new(
        engine.clone(),
        store.clone(),
        &ArchiveConfig::default(),
    ));
    let s1 = site("s1", Visibility::Public);
    let entity = Entity::Song(song("9", &s1, "shared"));
    store.upsert(entity.clone());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let entity = entity.clone();
            thread::spawn(move || manager.add_to_index(&entity))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap()?, IndexOutcome::Indexed);
    }

    let alias = manager.registry().alias(IndexKind::Song);
    assert_eq!(engine.indices_for_alias(&alias)?.len(), 1);
    assert_eq!(engine.doc_count(&alias), 1);

    Ok(())
}

#[test]
fn test_update_and_remove_of_unindexed_record_are_noops() -> archive_search::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let store = Arc::new(MemoryStore::new());
    let manager = IndexManager::new(engine.clone(), store.clone(), &ArchiveConfig::default());
    manager.ensure_alias(IndexKind::Song)?;

    let s1 = site("s1", Visibility::Public);
    let ghost = Entity::Song(song("404", &s1, "ghost"));
    assert_eq!(manager.update_in_index(&ghost)?, IndexOutcome::NotFound);
    assert_eq!(manager.remove_from_index(&ghost)?, IndexOutcome::NotFound);

    Ok(())
}

#[test]
fn test_sync_follows_the_store() -> archive_search::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let store = Arc::new(MemoryStore::new());
    let manager = IndexManager::new(engine.clone(), store.clone(), &ArchiveConfig::default());
    let s1 = site("s1", Visibility::Public);
    let alias = manager.registry().alias(IndexKind::DictionaryEntry);

    store.upsert(Entity::DictionaryEntry(word("1", &s1, "fish", "")));
    assert_eq!(manager.sync_in_index(RecordKind::DictionaryEntry, "1")?, IndexOutcome::Indexed);
    assert_eq!(engine.doc_count(&alias), 1);

    store.remove(RecordKind::DictionaryEntry, "1");
    assert_eq!(manager.sync_in_index(RecordKind::DictionaryEntry, "1")?, IndexOutcome::Removed);
    assert_eq!(engine.doc_count(&alias), 0);

    Ok(())
}

#[test]
fn test_site_visibility_change_resyncs_records() -> archive_search::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let store = Arc::new(MemoryStore::new());
    let manager = IndexManager::new(engine.clone(), store.clone(), &ArchiveConfig::default());

    let mut s1 = site("s1", Visibility::Public);
    store.upsert(Entity::Site(s1.clone()));
    store.upsert(Entity::Song(song("1", &s1, "one")));
    store.upsert(Entity::Song(song("2", &s1, "two")));
    manager.rebuild(IndexKind::Song)?;

    s1.visibility = Visibility::Members;
    store.upsert(Entity::Site(s1));
    assert_eq!(manager.propagate_site_visibility("s1")?, 2);

    let alias = manager.registry().alias(IndexKind::Song);
    for document in engine.documents(&alias) {
        assert_eq!(
            document.integer("site_visibility"),
            Some(Visibility::Members.level())
        );
    }

    Ok(())
}
