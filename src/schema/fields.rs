//! Index field names shared by the registry and the query compiler.

pub const DOCUMENT_ID: &str = "document_id";
/// Concrete store model, used to group hits for hydration.
pub const DOCUMENT_TYPE: &str = "document_type";
/// Client-facing type tag (word, phrase, song, ...).
pub const TYPE: &str = "type";

pub const SITE_ID: &str = "site_id";
pub const SITE_VISIBILITY: &str = "site_visibility";
pub const SITE_FEATURES: &str = "site_features";
pub const VISIBILITY: &str = "visibility";

pub const TITLE: &str = "title";
pub const TITLE_RAW: &str = "title.raw";
pub const TITLE_TOKEN_COUNT: &str = "title.token_count";
pub const CUSTOM_ORDER: &str = "custom_order";
pub const SORT_TITLE: &str = "sort_title";

pub const CREATED: &str = "created";
pub const LAST_MODIFIED: &str = "last_modified";

pub const CATEGORIES: &str = "categories";
pub const IMPORT_JOB_ID: &str = "import_job_id";
pub const EXTERNAL_SYSTEM: &str = "external_system";
pub const EXCLUDE_FROM_KIDS: &str = "exclude_from_kids";
pub const EXCLUDE_FROM_GAMES: &str = "exclude_from_games";

pub const HAS_AUDIO: &str = "has_audio";
pub const HAS_DOCUMENT: &str = "has_document";
pub const HAS_IMAGE: &str = "has_image";
pub const HAS_VIDEO: &str = "has_video";
pub const HAS_TRANSLATION: &str = "has_translation";
pub const HAS_UNRECOGNIZED_CHARS: &str = "has_unrecognized_chars";
pub const HAS_CATEGORIES: &str = "has_categories";
pub const HAS_RELATED_ENTRIES: &str = "has_related_entries";

// Relevance tiers. Every kind copies its text into these.
pub const PRIMARY_LANGUAGE: &str = "primary_language_search_fields";
pub const PRIMARY_TRANSLATION: &str = "primary_translation_search_fields";
pub const SECONDARY_LANGUAGE: &str = "secondary_language_search_fields";
pub const SECONDARY_TRANSLATION: &str = "secondary_translation_search_fields";
pub const OTHER_LANGUAGE: &str = "other_language_search_fields";
pub const OTHER_TRANSLATION: &str = "other_translation_search_fields";
/// Catch-all text of every searchable field.
pub const FULL_TEXT: &str = "full_text";

// Language index.
pub const LANGUAGE_NAME: &str = "language_name";
pub const LANGUAGE_CODE: &str = "language_code";
pub const LANGUAGE_ALTERNATE_NAMES: &str = "language_alternate_names";
pub const LANGUAGE_COMMUNITY_KEYWORDS: &str = "language_community_keywords";
pub const LANGUAGE_FAMILY_NAME: &str = "language_family_name";
pub const LANGUAGE_FAMILY_ALTERNATE_NAMES: &str = "language_family_alternate_names";
pub const SITE_NAMES: &str = "site_names";
pub const SITE_SLUGS: &str = "site_slugs";

/// Engine-maintained per-document sequence, the stable field for random scoring.
pub const SEQ_NO: &str = "_seq_no";
