#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use archive_search::model::{
    ContentMeta, DictionaryEntry, EntryType, Language, MediaItem, MediaKind, Site, Song,
};
use archive_search::{ArchiveConfig, Entity, MemoryEngine, MemoryStore, SearchService, Visibility};

pub fn site(id: &str, visibility: Visibility) -> Site {
    Site {
        id: id.into(),
        slug: id.into(),
        title: format!("Site {id}"),
        visibility,
        is_hidden: false,
        language_id: None,
        features: Vec::new(),
    }
}

pub fn meta(id: &str, site: &Site, title: &str, visibility: Visibility) -> ContentMeta {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    ContentMeta {
        id: id.into(),
        site: site.snapshot(),
        visibility,
        title: title.into(),
        created: at,
        last_modified: at,
        system_last_modified: None,
        exclude_from_kids: false,
        exclude_from_games: false,
        related_audio: Vec::new(),
        related_documents: Vec::new(),
        related_images: Vec::new(),
        related_videos: Vec::new(),
        related_video_links: Vec::new(),
        notes: Vec::new(),
        acknowledgements: Vec::new(),
    }
}

pub fn word(id: &str, site: &Site, title: &str, custom_order: &str) -> DictionaryEntry {
    DictionaryEntry {
        meta: meta(id, site, title, Visibility::Public),
        entry_type: EntryType::Word,
        translations: Vec::new(),
        alternate_spellings: Vec::new(),
        categories: Vec::new(),
        related_entries: Vec::new(),
        import_job_id: None,
        external_system: None,
        custom_order: custom_order.into(),
    }
}

pub fn song(id: &str, site: &Site, title: &str) -> Song {
    Song {
        meta: meta(id, site, title, Visibility::Public),
        title_translation: String::new(),
        introduction: String::new(),
        introduction_translation: String::new(),
        lyrics: Vec::new(),
    }
}

pub fn image(id: &str, site: &Site, title: &str) -> MediaItem {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    MediaItem {
        id: id.into(),
        site: site.snapshot(),
        kind: MediaKind::Image,
        title: title.into(),
        description: String::new(),
        filename: None,
        created: at,
        last_modified: at,
        exclude_from_kids: false,
        exclude_from_games: false,
    }
}

pub fn language(id: &str, title: &str, sites: &[&Site]) -> Language {
    Language {
        id: id.into(),
        title: title.into(),
        language_code: String::new(),
        alternate_names: String::new(),
        community_keywords: String::new(),
        family_name: String::new(),
        family_alternate_names: String::new(),
        sites: sites.iter().map(|s| s.snapshot()).collect(),
    }
}

/// A service over an in-memory engine and store.
pub struct Harness {
    pub engine: Arc<MemoryEngine>,
    pub store: Arc<MemoryStore>,
    pub service: SearchService,
}

impl Harness {
    pub fn new(config: ArchiveConfig) -> Self {
        let engine = Arc::new(MemoryEngine::new());
        let store = Arc::new(MemoryStore::new());
        let service = SearchService::new(engine.clone(), store.clone(), config);
        Harness {
            engine,
            store,
            service,
        }
    }

    /// Store every entity, then rebuild every index.
    pub fn seeded(config: ArchiveConfig, entities: Vec<Entity>) -> archive_search::Result<Self> {
        let harness = Self::new(config);
        for entity in entities {
            harness.store.upsert(entity);
        }
        harness.service.rebuild_all()?;
        Ok(harness)
    }
}
