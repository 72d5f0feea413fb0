//! Maps every domain record onto its index document.

use unicode_segmentation::UnicodeSegmentation;

use crate::collation::sort_key::contains_unknown;
use crate::data::{FieldValue, IndexDocument};
use crate::model::{
    DictionaryEntry, Entity, Language, MediaItem, RecordKind, Site, Song, Story, TypeTag,
    Visibility,
};
use crate::schema::IndexKind;
use crate::schema::fields as f;

/// Resolves aliases and builds index documents.
///
/// The match over [`Entity`] is exhaustive, so adding a record kind fails to
/// compile until it has a mapping.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    prefix: String,
}

impl SchemaRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        SchemaRegistry {
            prefix: prefix.into(),
        }
    }

    /// Stable alias readers query for `kind`.
    pub fn alias(&self, kind: IndexKind) -> String {
        if self.prefix.is_empty() {
            kind.alias_base().to_string()
        } else {
            format!("{}_{}", self.prefix, kind.alias_base())
        }
    }

    pub fn index_kind(&self, entity: &Entity) -> IndexKind {
        IndexKind::for_record(entity.record_kind())
    }

    /// Engine-side document id. Deterministic, so a retried add overwrites
    /// instead of duplicating.
    pub fn engine_id(&self, kind: RecordKind, entity_id: &str) -> String {
        format!("{kind}:{entity_id}")
    }

    pub fn type_tag(&self, entity: &Entity) -> Option<TypeTag> {
        match entity {
            Entity::DictionaryEntry(e) => Some(TypeTag::from_entry_type(e.entry_type)),
            Entity::Song(_) => Some(TypeTag::Song),
            Entity::Story(_) => Some(TypeTag::Story),
            Entity::Media(m) => Some(TypeTag::from_media_kind(m.kind)),
            Entity::Language(_) | Entity::Site(_) => None,
        }
    }

    /// Whether the record belongs in its index at all.
    pub fn should_be_indexed(&self, entity: &Entity) -> bool {
        match entity {
            Entity::Language(language) => language.visible_sites().next().is_some(),
            Entity::Site(site) => {
                site.language_id.is_none()
                    && site.visibility >= Visibility::Members
                    && !site.is_hidden
            }
            Entity::DictionaryEntry(_) | Entity::Song(_) | Entity::Story(_) | Entity::Media(_) => {
                true
            }
        }
    }

    pub fn to_document(&self, entity: &Entity) -> IndexDocument {
        let kind = entity.record_kind();
        let document = match entity {
            Entity::Language(language) => language_document(language),
            Entity::Site(site) => site_document(site),
            Entity::DictionaryEntry(entry) => dictionary_entry_document(entry),
            Entity::Song(song) => song_document(song),
            Entity::Story(story) => story_document(story),
            Entity::Media(media) => media_document(media),
        };

        let mut document = document
            .add_keyword(f::DOCUMENT_ID, entity.id())
            .add_keyword(f::DOCUMENT_TYPE, kind.to_string())
            .build();
        document.id = Some(self.engine_id(kind, entity.id()));
        document
    }
}

type Builder = crate::data::IndexDocumentBuilder;

fn non_empty<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn token_count(title: &str) -> i64 {
    title.unicode_words().count() as i64
}

fn title_fields(builder: Builder, title: &str) -> Builder {
    builder
        .add_text(f::TITLE, title)
        .add_keyword(f::TITLE_RAW, title)
        .add_field(f::TITLE_TOKEN_COUNT, token_count(title))
}

/// Tier fields plus the catch-all built from all of them.
struct Tiers {
    primary_language: Vec<String>,
    primary_translation: Vec<String>,
    secondary_language: Vec<String>,
    secondary_translation: Vec<String>,
    other_language: Vec<String>,
    other_translation: Vec<String>,
    extra: Vec<String>,
}

impl Tiers {
    fn apply(self, builder: Builder) -> Builder {
        let full_text: Vec<String> = self
            .primary_language
            .iter()
            .chain(&self.primary_translation)
            .chain(&self.secondary_language)
            .chain(&self.secondary_translation)
            .chain(&self.other_language)
            .chain(&self.other_translation)
            .chain(&self.extra)
            .cloned()
            .collect();
        builder
            .add_list(f::PRIMARY_LANGUAGE, self.primary_language)
            .add_list(f::PRIMARY_TRANSLATION, self.primary_translation)
            .add_list(f::SECONDARY_LANGUAGE, self.secondary_language)
            .add_list(f::SECONDARY_TRANSLATION, self.secondary_translation)
            .add_list(f::OTHER_LANGUAGE, self.other_language)
            .add_list(f::OTHER_TRANSLATION, self.other_translation)
            .add_list(f::FULL_TEXT, full_text)
    }
}

fn language_document(language: &Language) -> Builder {
    let visible: Vec<_> = language.visible_sites().collect();
    Builder::default()
        .add_keyword(f::SORT_TITLE, language.title.to_uppercase())
        .add_text(f::LANGUAGE_NAME, &language.title)
        .add_list(f::LANGUAGE_CODE, non_empty(split_list(&language.language_code)))
        .add_list(
            f::LANGUAGE_ALTERNATE_NAMES,
            non_empty(split_list(&language.alternate_names)),
        )
        .add_list(
            f::LANGUAGE_COMMUNITY_KEYWORDS,
            non_empty(split_list(&language.community_keywords)),
        )
        .add_text(f::LANGUAGE_FAMILY_NAME, &language.family_name)
        .add_list(
            f::LANGUAGE_FAMILY_ALTERNATE_NAMES,
            non_empty(split_list(&language.family_alternate_names)),
        )
        .add_list(f::SITE_NAMES, visible.iter().map(|s| s.title.clone()))
        .add_list(f::SITE_SLUGS, visible.iter().map(|s| s.slug.clone()))
}

/// Sites without a language are listed in the language index on their own.
fn site_document(site: &Site) -> Builder {
    Builder::default()
        .add_keyword(f::SORT_TITLE, site.title.to_uppercase())
        .add_list(f::SITE_NAMES, [site.title.clone()])
        .add_list(f::SITE_SLUGS, [site.slug.clone()])
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',')
}

fn dictionary_entry_document(entry: &DictionaryEntry) -> Builder {
    let meta = &entry.meta;
    let builder = title_fields(Builder::default(), &meta.title)
        .add_keyword(f::TYPE, TypeTag::from_entry_type(entry.entry_type).as_str())
        .add_keyword(f::SITE_ID, &meta.site.id)
        .add_field(f::SITE_VISIBILITY, meta.site.visibility.level())
        .add_field(f::VISIBILITY, meta.visibility.level())
        .add_keyword(f::CUSTOM_ORDER, &entry.custom_order)
        .add_list(f::CATEGORIES, entry.categories.clone())
        .add_field(f::IMPORT_JOB_ID, entry.import_job_id.clone().map(FieldValue::Keyword))
        .add_field(
            f::EXTERNAL_SYSTEM,
            entry.external_system.clone().map(FieldValue::Keyword),
        )
        .add_field(f::EXCLUDE_FROM_KIDS, meta.exclude_from_kids)
        .add_field(f::EXCLUDE_FROM_GAMES, meta.exclude_from_games)
        .add_field(f::HAS_AUDIO, meta.has_audio())
        .add_field(f::HAS_DOCUMENT, meta.has_document())
        .add_field(f::HAS_IMAGE, meta.has_image())
        .add_field(f::HAS_VIDEO, meta.has_video())
        .add_field(f::HAS_TRANSLATION, !entry.translations.is_empty())
        .add_field(f::HAS_UNRECOGNIZED_CHARS, contains_unknown(&entry.custom_order))
        .add_field(f::HAS_CATEGORIES, !entry.categories.is_empty())
        .add_field(f::HAS_RELATED_ENTRIES, !entry.related_entries.is_empty())
        .add_field(f::CREATED, meta.created)
        .add_field(f::LAST_MODIFIED, meta.last_modified);

    Tiers {
        primary_language: non_empty([meta.title.as_str()]),
        primary_translation: non_empty(entry.translations.iter().map(String::as_str)),
        secondary_language: non_empty(entry.alternate_spellings.iter().map(String::as_str)),
        secondary_translation: Vec::new(),
        other_language: Vec::new(),
        other_translation: non_empty(
            meta.notes
                .iter()
                .chain(&meta.acknowledgements)
                .map(String::as_str),
        ),
        extra: Vec::new(),
    }
    .apply(builder)
}

fn content_fields(builder: Builder, meta: &crate::model::ContentMeta, tag: TypeTag) -> Builder {
    title_fields(builder, &meta.title)
        .add_keyword(f::TYPE, tag.as_str())
        .add_keyword(f::SITE_ID, &meta.site.id)
        .add_field(f::SITE_VISIBILITY, meta.site.visibility.level())
        .add_field(f::VISIBILITY, meta.visibility.level())
        .add_field(f::EXCLUDE_FROM_KIDS, meta.exclude_from_kids)
        .add_field(f::EXCLUDE_FROM_GAMES, meta.exclude_from_games)
        .add_field(f::HAS_AUDIO, meta.has_audio())
        .add_field(f::HAS_DOCUMENT, meta.has_document())
        .add_field(f::HAS_IMAGE, meta.has_image())
        .add_field(f::HAS_VIDEO, meta.has_video())
        .add_field(f::CREATED, meta.created)
        .add_field(f::LAST_MODIFIED, meta.last_modified)
}

fn song_document(song: &Song) -> Builder {
    let meta = &song.meta;
    let builder = content_fields(Builder::default(), meta, TypeTag::Song)
        .add_field(f::HAS_TRANSLATION, !song.title_translation.trim().is_empty());

    Tiers {
        primary_language: non_empty([meta.title.as_str()]),
        primary_translation: non_empty([song.title_translation.as_str()]),
        secondary_language: non_empty([song.introduction.as_str()]),
        secondary_translation: non_empty([song.introduction_translation.as_str()]),
        other_language: non_empty(song.lyrics.iter().map(|l| l.text.as_str())),
        other_translation: non_empty(
            song.lyrics
                .iter()
                .map(|l| l.translation.as_str())
                .chain(meta.notes.iter().map(String::as_str))
                .chain(meta.acknowledgements.iter().map(String::as_str)),
        ),
        extra: Vec::new(),
    }
    .apply(builder)
}

fn story_document(story: &Story) -> Builder {
    let meta = &story.meta;
    let builder = content_fields(Builder::default(), meta, TypeTag::Story)
        .add_field(f::HAS_TRANSLATION, !story.title_translation.trim().is_empty());

    Tiers {
        primary_language: non_empty([meta.title.as_str()]),
        primary_translation: non_empty([story.title_translation.as_str()]),
        secondary_language: non_empty([story.introduction.as_str()]),
        secondary_translation: non_empty([story.introduction_translation.as_str()]),
        other_language: non_empty(story.pages.iter().map(|p| p.text.as_str())),
        other_translation: non_empty(
            story
                .pages
                .iter()
                .map(|p| p.translation.as_str())
                .chain(meta.notes.iter().map(String::as_str))
                .chain(meta.acknowledgements.iter().map(String::as_str)),
        ),
        extra: non_empty([story.author.as_str()]),
    }
    .apply(builder)
}

/// Media is indexed as public; access is decided by the owning site.
fn media_document(media: &MediaItem) -> Builder {
    let builder = title_fields(Builder::default(), &media.title)
        .add_keyword(f::TYPE, media.kind.as_str())
        .add_keyword(f::SITE_ID, &media.site.id)
        .add_field(f::SITE_VISIBILITY, media.site.visibility.level())
        .add_field(f::VISIBILITY, Visibility::Public.level())
        .add_list(f::SITE_FEATURES, media.site.features.clone())
        .add_field(f::EXCLUDE_FROM_KIDS, media.exclude_from_kids)
        .add_field(f::EXCLUDE_FROM_GAMES, media.exclude_from_games)
        .add_field(f::CREATED, media.created)
        .add_field(f::LAST_MODIFIED, media.last_modified);

    Tiers {
        primary_language: non_empty([media.title.as_str()]),
        primary_translation: Vec::new(),
        secondary_language: Vec::new(),
        secondary_translation: non_empty([media.description.as_str()]),
        other_language: non_empty(media.filename.as_deref()),
        other_translation: Vec::new(),
        extra: Vec::new(),
    }
    .apply(builder)
}
