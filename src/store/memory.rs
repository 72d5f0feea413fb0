//! In-memory system of record, loadable from a JSON fixture.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::collation::Alphabet;
use crate::error::{ArchiveError, Result};
use crate::model::{
    Category, DictionaryEntry, Entity, EntityId, Language, MediaItem, RecordKind, Site, SiteId,
    Song, Story,
};
use crate::store::{EagerLoad, EntityStream, SystemOfRecord};

/// Serialized contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub dictionary_entries: Vec<DictionaryEntry>,
    #[serde(default)]
    pub songs: Vec<Song>,
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub alphabets: Vec<Alphabet>,
}

#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordKind, BTreeMap<EntityId, Entity>>>,
    categories: RwLock<BTreeMap<EntityId, Category>>,
    alphabets: RwLock<HashMap<SiteId, Alphabet>>,
    available: AtomicBool,
    batch_lookups: AtomicUsize,
    last_hints: Mutex<HashMap<RecordKind, EagerLoad>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            records: RwLock::new(HashMap::new()),
            categories: RwLock::new(BTreeMap::new()),
            alphabets: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            batch_lookups: AtomicUsize::new(0),
            last_hints: Mutex::new(HashMap::new()),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: StoreFixture) -> Self {
        let store = MemoryStore::new();
        for language in fixture.languages {
            store.upsert(Entity::Language(language));
        }
        for entry in fixture.dictionary_entries {
            store.upsert(Entity::DictionaryEntry(entry));
        }
        for song in fixture.songs {
            store.upsert(Entity::Song(song));
        }
        for story in fixture.stories {
            store.upsert(Entity::Story(story));
        }
        for media in fixture.media {
            store.upsert(Entity::Media(media));
        }
        // Sites last so their snapshots win over the embedded copies.
        for site in fixture.sites {
            store.upsert(Entity::Site(site));
        }
        for category in fixture.categories {
            store.upsert_category(category);
        }
        for alphabet in fixture.alphabets {
            store.set_alphabet(alphabet);
        }
        store
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let fixture: StoreFixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Insert or replace a record. Saving a site refreshes the site snapshot
    /// held by its content and its language.
    pub fn upsert(&self, entity: Entity) {
        let mut records = self.records.write();
        if let Entity::Site(site) = &entity {
            refresh_site_snapshots(&mut records, site);
        }
        records
            .entry(entity.record_kind())
            .or_default()
            .insert(entity.id().to_string(), entity);
    }

    pub fn remove(&self, kind: RecordKind, id: &str) -> Option<Entity> {
        self.records.write().get_mut(&kind)?.remove(id)
    }

    pub fn upsert_category(&self, category: Category) {
        self.categories.write().insert(category.id.clone(), category);
    }

    pub fn set_alphabet(&self, alphabet: Alphabet) {
        self.alphabets
            .write()
            .insert(alphabet.site_id.clone(), alphabet);
    }

    pub fn len(&self, kind: RecordKind) -> usize {
        self.records.read().get(&kind).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().values().all(BTreeMap::is_empty)
    }

    /// Simulate an outage; every call fails while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `fetch_many` calls served so far.
    pub fn batch_lookups(&self) -> usize {
        self.batch_lookups.load(Ordering::SeqCst)
    }

    /// Hints passed with the most recent batched lookup of `kind`.
    pub fn last_hints(&self, kind: RecordKind) -> Option<EagerLoad> {
        self.last_hints.lock().get(&kind).cloned()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ArchiveError::store("system of record unavailable"))
        }
    }
}

fn refresh_site_snapshots(records: &mut HashMap<RecordKind, BTreeMap<EntityId, Entity>>, site: &Site) {
    let snapshot = site.snapshot();
    for (kind, by_id) in records.iter_mut() {
        for entity in by_id.values_mut() {
            match entity {
                Entity::DictionaryEntry(e) if e.meta.site.id == site.id => {
                    e.meta.site = snapshot.clone()
                }
                Entity::Song(s) if s.meta.site.id == site.id => s.meta.site = snapshot.clone(),
                Entity::Story(s) if s.meta.site.id == site.id => s.meta.site = snapshot.clone(),
                Entity::Media(m) if m.site.id == site.id => m.site = snapshot.clone(),
                Entity::Language(l) if *kind == RecordKind::Language => {
                    l.sites.retain(|s| s.id != site.id);
                    if site.language_id.as_deref() == Some(l.id.as_str()) {
                        l.sites.push(snapshot.clone());
                    }
                }
                _ => {}
            }
        }
    }
}

impl SystemOfRecord for MemoryStore {
    fn fetch(&self, kind: RecordKind, id: &str) -> Result<Option<Entity>> {
        self.check_available()?;
        Ok(self
            .records
            .read()
            .get(&kind)
            .and_then(|by_id| by_id.get(id))
            .cloned())
    }

    fn fetch_many(
        &self,
        kind: RecordKind,
        ids: &[EntityId],
        eager: &EagerLoad,
    ) -> Result<HashMap<EntityId, Entity>> {
        self.check_available()?;
        self.batch_lookups.fetch_add(1, Ordering::SeqCst);
        self.last_hints.lock().insert(kind, eager.clone());

        let records = self.records.read();
        let Some(by_id) = records.get(&kind) else {
            return Ok(HashMap::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|e| (id.clone(), e.clone())))
            .collect())
    }

    fn stream(&self, kind: RecordKind) -> Result<EntityStream<'_>> {
        self.check_available()?;
        let ids: Vec<EntityId> = self
            .records
            .read()
            .get(&kind)
            .map(|by_id| by_id.keys().cloned().collect())
            .unwrap_or_default();

        Ok(Box::new(ids.into_iter().filter_map(move |id| {
            self.fetch(kind, &id).transpose()
        })))
    }

    fn site_records(&self, site_id: &str) -> Result<Vec<(RecordKind, EntityId)>> {
        self.check_available()?;
        let records = self.records.read();
        let mut owned = Vec::new();
        for (kind, by_id) in records.iter() {
            if matches!(kind, RecordKind::Language | RecordKind::Site) {
                continue;
            }
            owned.extend(
                by_id
                    .values()
                    .filter(|e| e.site_id() == Some(site_id))
                    .map(|e| (*kind, e.id().to_string())),
            );
        }
        owned.sort();
        Ok(owned)
    }

    fn category(&self, category_id: &str) -> Result<Option<Category>> {
        self.check_available()?;
        Ok(self.categories.read().get(category_id).cloned())
    }

    fn child_categories(&self, category_id: &str) -> Result<Vec<EntityId>> {
        self.check_available()?;
        Ok(self
            .categories
            .read()
            .values()
            .filter(|c| c.parent_id.as_deref() == Some(category_id))
            .map(|c| c.id.clone())
            .collect())
    }

    fn alphabet(&self, site_id: &str) -> Result<Option<Alphabet>> {
        self.check_available()?;
        Ok(self.alphabets.read().get(site_id).cloned())
    }

    fn dictionary_entries(&self, site_id: &str) -> Result<Vec<DictionaryEntry>> {
        self.check_available()?;
        let records = self.records.read();
        Ok(records
            .get(&RecordKind::DictionaryEntry)
            .map(|by_id| {
                by_id
                    .values()
                    .filter_map(|e| match e {
                        Entity::DictionaryEntry(entry) if entry.meta.site.id == site_id => {
                            Some(entry.clone())
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn save_collation(
        &self,
        entry_id: &str,
        cleaned_title: &str,
        order_key: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_available()?;
        let mut records = self.records.write();
        match records
            .get_mut(&RecordKind::DictionaryEntry)
            .and_then(|by_id| by_id.get_mut(entry_id))
        {
            Some(Entity::DictionaryEntry(entry)) => {
                entry.meta.title = cleaned_title.to_string();
                entry.custom_order = order_key.to_string();
                entry.meta.system_last_modified = Some(at);
                Ok(())
            }
            _ => Err(ArchiveError::store(format!(
                "dictionary entry '{entry_id}' does not exist"
            ))),
        }
    }
}
