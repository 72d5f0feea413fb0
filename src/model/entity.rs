use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;
use crate::model::visibility::Visibility;

pub type EntityId = String;
pub type SiteId = String;

/// Snapshot of the owning site, eager-loaded with every content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRef {
    pub id: SiteId,
    pub slug: String,
    pub title: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_hidden: bool,
    /// Keys of the site's enabled features.
    #[serde(default)]
    pub features: Vec<String>,
}

/// A tenant site. Indexed into the language index when it has no language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub slug: String,
    pub title: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub language_id: Option<EntityId>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Site {
    pub fn snapshot(&self) -> SiteRef {
        SiteRef {
            id: self.id.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            visibility: self.visibility,
            is_hidden: self.is_hidden,
            features: self.features.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub alternate_names: String,
    #[serde(default)]
    pub community_keywords: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub family_alternate_names: String,
    /// Every site attached to this language, hidden or not.
    #[serde(default)]
    pub sites: Vec<SiteRef>,
}

impl Language {
    /// Sites that make the language discoverable: members-visible and not hidden.
    pub fn visible_sites(&self) -> impl Iterator<Item = &SiteRef> {
        self.sites
            .iter()
            .filter(|s| s.visibility >= Visibility::Members && !s.is_hidden)
    }
}

/// Fields shared by every site-owned content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMeta {
    pub id: EntityId,
    pub site: SiteRef,
    pub visibility: Visibility,
    pub title: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Bumped by system-triggered normalization, never by content edits.
    #[serde(default)]
    pub system_last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exclude_from_kids: bool,
    #[serde(default)]
    pub exclude_from_games: bool,
    #[serde(default)]
    pub related_audio: Vec<EntityId>,
    #[serde(default)]
    pub related_documents: Vec<EntityId>,
    #[serde(default)]
    pub related_images: Vec<EntityId>,
    #[serde(default)]
    pub related_videos: Vec<EntityId>,
    #[serde(default)]
    pub related_video_links: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub acknowledgements: Vec<String>,
}

impl ContentMeta {
    pub fn has_audio(&self) -> bool {
        !self.related_audio.is_empty()
    }

    pub fn has_document(&self) -> bool {
        !self.related_documents.is_empty()
    }

    pub fn has_image(&self) -> bool {
        !self.related_images.is_empty()
    }

    pub fn has_video(&self) -> bool {
        !self.related_videos.is_empty() || !self.related_video_links.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Word,
    Phrase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    #[serde(flatten)]
    pub meta: ContentMeta,
    pub entry_type: EntryType,
    #[serde(default)]
    pub translations: Vec<String>,
    #[serde(default)]
    pub alternate_spellings: Vec<String>,
    #[serde(default)]
    pub categories: Vec<EntityId>,
    #[serde(default)]
    pub related_entries: Vec<EntityId>,
    #[serde(default)]
    pub import_job_id: Option<EntityId>,
    #[serde(default)]
    pub external_system: Option<String>,
    /// Collation key of the title under the site alphabet.
    #[serde(default)]
    pub custom_order: String,
}

/// One line of lyrics or one story page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    #[serde(default)]
    pub translation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    #[serde(flatten)]
    pub meta: ContentMeta,
    #[serde(default)]
    pub title_translation: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub introduction_translation: String,
    #[serde(default)]
    pub lyrics: Vec<TextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(flatten)]
    pub meta: ContentMeta,
    #[serde(default)]
    pub title_translation: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub introduction_translation: String,
    #[serde(default)]
    pub pages: Vec<TextBlock>,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Document,
    Image,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Audio,
        MediaKind::Document,
        MediaKind::Image,
        MediaKind::Video,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// Media is always indexed as public; access follows the owning site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: EntityId,
    pub site: SiteRef,
    pub kind: MediaKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub filename: Option<String>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub exclude_from_kids: bool,
    #[serde(default)]
    pub exclude_from_games: bool,
}

/// A category; the hierarchy is exactly two levels deep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub site_id: SiteId,
    pub title: String,
    #[serde(default)]
    pub parent_id: Option<EntityId>,
}

/// Every record kind the search layer can index or hydrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Entity {
    Language(Language),
    Site(Site),
    DictionaryEntry(DictionaryEntry),
    Song(Song),
    Story(Story),
    Media(MediaItem),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Language(l) => &l.id,
            Entity::Site(s) => &s.id,
            Entity::DictionaryEntry(e) => &e.meta.id,
            Entity::Song(s) => &s.meta.id,
            Entity::Story(s) => &s.meta.id,
            Entity::Media(m) => &m.id,
        }
    }

    pub fn record_kind(&self) -> RecordKind {
        match self {
            Entity::Language(_) => RecordKind::Language,
            Entity::Site(_) => RecordKind::Site,
            Entity::DictionaryEntry(_) => RecordKind::DictionaryEntry,
            Entity::Song(_) => RecordKind::Song,
            Entity::Story(_) => RecordKind::Story,
            Entity::Media(m) => RecordKind::Media(m.kind),
        }
    }

    /// Owning site, for site-scoped records.
    pub fn site_id(&self) -> Option<&str> {
        match self {
            Entity::Language(_) => None,
            Entity::Site(s) => Some(&s.id),
            Entity::DictionaryEntry(e) => Some(&e.meta.site.id),
            Entity::Song(s) => Some(&s.meta.site.id),
            Entity::Story(s) => Some(&s.meta.site.id),
            Entity::Media(m) => Some(&m.site.id),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Entity::Language(l) => &l.title,
            Entity::Site(s) => &s.title,
            Entity::DictionaryEntry(e) => &e.meta.title,
            Entity::Song(s) => &s.meta.title,
            Entity::Story(s) => &s.meta.title,
            Entity::Media(m) => &m.title,
        }
    }

    /// Effective visibility: the stricter of the record's and its site's.
    pub fn visibility(&self) -> Visibility {
        match self {
            Entity::Language(_) => Visibility::Public,
            Entity::Site(s) => s.visibility,
            Entity::DictionaryEntry(e) => e.meta.visibility.min(e.meta.site.visibility),
            Entity::Song(s) => s.meta.visibility.min(s.meta.site.visibility),
            Entity::Story(s) => s.meta.visibility.min(s.meta.site.visibility),
            Entity::Media(m) => m.site.visibility,
        }
    }
}

/// Concrete system-of-record model. Media is split by sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Language,
    Site,
    DictionaryEntry,
    Song,
    Story,
    Media(MediaKind),
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Language => f.write_str("language"),
            RecordKind::Site => f.write_str("site"),
            RecordKind::DictionaryEntry => f.write_str("dictionary_entry"),
            RecordKind::Song => f.write_str("song"),
            RecordKind::Story => f.write_str("story"),
            RecordKind::Media(kind) => f.write_str(kind.as_str()),
        }
    }
}

impl FromStr for RecordKind {
    type Err = ArchiveError;

    /// Inverse of `Display`, as stored in the `document_type` field.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "language" => Ok(RecordKind::Language),
            "site" => Ok(RecordKind::Site),
            "dictionary_entry" => Ok(RecordKind::DictionaryEntry),
            "song" => Ok(RecordKind::Song),
            "story" => Ok(RecordKind::Story),
            other => MediaKind::ALL
                .into_iter()
                .find(|kind| kind.as_str() == other)
                .map(RecordKind::Media)
                .ok_or_else(|| ArchiveError::invalid_argument(format!("unknown record kind '{other}'"))),
        }
    }
}

/// Client-facing result type, also used for the `types` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Word,
    Phrase,
    Song,
    Story,
    Audio,
    Document,
    Image,
    Video,
}

impl TypeTag {
    pub const ALL: [TypeTag; 8] = [
        TypeTag::Word,
        TypeTag::Phrase,
        TypeTag::Song,
        TypeTag::Story,
        TypeTag::Audio,
        TypeTag::Document,
        TypeTag::Image,
        TypeTag::Video,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Word => "word",
            TypeTag::Phrase => "phrase",
            TypeTag::Song => "song",
            TypeTag::Story => "story",
            TypeTag::Audio => "audio",
            TypeTag::Document => "document",
            TypeTag::Image => "image",
            TypeTag::Video => "video",
        }
    }

    pub fn from_entry_type(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::Word => TypeTag::Word,
            EntryType::Phrase => TypeTag::Phrase,
        }
    }

    pub fn from_media_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Audio => TypeTag::Audio,
            MediaKind::Document => TypeTag::Document,
            MediaKind::Image => TypeTag::Image,
            MediaKind::Video => TypeTag::Video,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        TypeTag::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| ArchiveError::invalid_argument(format!("unknown type '{lowered}'")))
    }
}
