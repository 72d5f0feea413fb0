//! Domain records read from the system of record.

pub mod entity;
pub mod visibility;

pub use entity::{
    Category, ContentMeta, DictionaryEntry, Entity, EntityId, EntryType, Language, MediaItem,
    MediaKind, RecordKind, Site, SiteId, SiteRef, Song, Story, TextBlock, TypeTag,
};
pub use visibility::{Role, Visibility};
