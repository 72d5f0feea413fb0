//! Index document schemas and the per-kind registry.

pub mod fields;
pub mod registry;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{MediaKind, RecordKind, TypeTag};

pub use registry::SchemaRegistry;

/// Declares the fields of one index and how each is indexed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: HashMap<String, FieldType>,
    /// Fields searched by catch-all queries.
    #[serde(default)]
    pub default_fields: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    /// Mapping used when creating a generation for `kind`.
    pub fn for_kind(kind: IndexKind) -> Schema {
        let builder = match kind {
            IndexKind::Language => Schema::builder()
                .add_keyword_field(fields::SORT_TITLE)
                .add_text_field(fields::LANGUAGE_NAME)
                .add_text_field(fields::LANGUAGE_CODE)
                .add_text_field(fields::LANGUAGE_ALTERNATE_NAMES)
                .add_text_field(fields::LANGUAGE_COMMUNITY_KEYWORDS)
                .add_text_field(fields::LANGUAGE_FAMILY_NAME)
                .add_text_field(fields::LANGUAGE_FAMILY_ALTERNATE_NAMES)
                .add_text_field(fields::SITE_NAMES)
                .add_text_field(fields::SITE_SLUGS)
                .add_default_field(fields::LANGUAGE_NAME)
                .add_default_field(fields::SITE_NAMES),
            IndexKind::DictionaryEntry | IndexKind::Song | IndexKind::Story | IndexKind::Media => {
                let mut builder = Schema::builder()
                    .add_keyword_field(fields::TYPE)
                    .add_keyword_field(fields::SITE_ID)
                    .add_field(fields::SITE_VISIBILITY, FieldType::Integer)
                    .add_field(fields::VISIBILITY, FieldType::Integer)
                    .add_text_field(fields::TITLE)
                    .add_keyword_field(fields::TITLE_RAW)
                    .add_field(fields::TITLE_TOKEN_COUNT, FieldType::Integer)
                    .add_field(fields::CREATED, FieldType::Date)
                    .add_field(fields::LAST_MODIFIED, FieldType::Date)
                    .add_field(fields::EXCLUDE_FROM_KIDS, FieldType::Boolean)
                    .add_field(fields::EXCLUDE_FROM_GAMES, FieldType::Boolean)
                    .add_text_field(fields::PRIMARY_LANGUAGE)
                    .add_text_field(fields::PRIMARY_TRANSLATION)
                    .add_text_field(fields::SECONDARY_LANGUAGE)
                    .add_text_field(fields::SECONDARY_TRANSLATION)
                    .add_text_field(fields::OTHER_LANGUAGE)
                    .add_text_field(fields::OTHER_TRANSLATION)
                    .add_text_field(fields::FULL_TEXT)
                    .add_default_field(fields::TITLE)
                    .add_default_field(fields::FULL_TEXT);
                if kind == IndexKind::Media {
                    builder = builder.add_keyword_field(fields::SITE_FEATURES);
                } else {
                    builder = builder
                        .add_field(fields::HAS_AUDIO, FieldType::Boolean)
                        .add_field(fields::HAS_DOCUMENT, FieldType::Boolean)
                        .add_field(fields::HAS_IMAGE, FieldType::Boolean)
                        .add_field(fields::HAS_VIDEO, FieldType::Boolean)
                        .add_field(fields::HAS_TRANSLATION, FieldType::Boolean);
                }
                if kind == IndexKind::DictionaryEntry {
                    builder = builder
                        .add_keyword_field(fields::CUSTOM_ORDER)
                        .add_keyword_field(fields::CATEGORIES)
                        .add_keyword_field(fields::IMPORT_JOB_ID)
                        .add_keyword_field(fields::EXTERNAL_SYSTEM)
                        .add_field(fields::HAS_UNRECOGNIZED_CHARS, FieldType::Boolean)
                        .add_field(fields::HAS_CATEGORIES, FieldType::Boolean)
                        .add_field(fields::HAS_RELATED_ENTRIES, FieldType::Boolean);
                }
                builder
            }
        };

        builder
            .add_keyword_field(fields::DOCUMENT_ID)
            .add_keyword_field(fields::DOCUMENT_TYPE)
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Exact value, used for filters and sorting.
    Keyword,
    /// Analyzed full text.
    Text,
    Integer,
    Boolean,
    Date,
}

#[derive(Default)]
pub struct SchemaBuilder {
    fields: HashMap<String, FieldType>,
    default_fields: Vec<String>,
}

impl SchemaBuilder {
    pub fn add_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    pub fn add_keyword_field(self, name: impl Into<String>) -> Self {
        self.add_field(name, FieldType::Keyword)
    }

    pub fn add_text_field(self, name: impl Into<String>) -> Self {
        self.add_field(name, FieldType::Text)
    }

    pub fn add_default_field(mut self, name: impl Into<String>) -> Self {
        self.default_fields.push(name.into());
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
            default_fields: self.default_fields,
        }
    }
}

/// One alias, and one family of generations, per indexed kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Language,
    DictionaryEntry,
    Song,
    Story,
    Media,
}

impl IndexKind {
    pub const ALL: [IndexKind; 5] = [
        IndexKind::Language,
        IndexKind::DictionaryEntry,
        IndexKind::Song,
        IndexKind::Story,
        IndexKind::Media,
    ];

    /// Alias name before the configured prefix is applied.
    pub fn alias_base(self) -> &'static str {
        match self {
            IndexKind::Language => "language",
            IndexKind::DictionaryEntry => "dictionary_entries",
            IndexKind::Song => "songs",
            IndexKind::Story => "stories",
            IndexKind::Media => "media",
        }
    }

    /// Store models streamed into this index on rebuild.
    pub fn record_kinds(self) -> &'static [RecordKind] {
        match self {
            IndexKind::Language => &[RecordKind::Language, RecordKind::Site],
            IndexKind::DictionaryEntry => &[RecordKind::DictionaryEntry],
            IndexKind::Song => &[RecordKind::Song],
            IndexKind::Story => &[RecordKind::Story],
            IndexKind::Media => &[
                RecordKind::Media(MediaKind::Video),
                RecordKind::Media(MediaKind::Image),
                RecordKind::Media(MediaKind::Document),
                RecordKind::Media(MediaKind::Audio),
            ],
        }
    }

    pub fn for_record(kind: RecordKind) -> IndexKind {
        match kind {
            RecordKind::Language | RecordKind::Site => IndexKind::Language,
            RecordKind::DictionaryEntry => IndexKind::DictionaryEntry,
            RecordKind::Song => IndexKind::Song,
            RecordKind::Story => IndexKind::Story,
            RecordKind::Media(_) => IndexKind::Media,
        }
    }

    pub fn for_type_tag(tag: TypeTag) -> IndexKind {
        match tag {
            TypeTag::Word | TypeTag::Phrase => IndexKind::DictionaryEntry,
            TypeTag::Song => IndexKind::Song,
            TypeTag::Story => IndexKind::Story,
            TypeTag::Audio | TypeTag::Document | TypeTag::Image | TypeTag::Video => {
                IndexKind::Media
            }
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias_base())
    }
}

impl std::str::FromStr for IndexKind {
    type Err = crate::error::ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        IndexKind::ALL
            .into_iter()
            .find(|k| k.alias_base() == lowered || format!("{k:?}").to_ascii_lowercase() == lowered)
            .ok_or_else(|| {
                crate::error::ArchiveError::invalid_argument(format!("unknown index kind '{s}'"))
            })
    }
}
