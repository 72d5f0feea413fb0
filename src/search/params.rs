//! Raw request parameters and their validators.
//!
//! Validation never fails a request: bad values fall back to defaults, and
//! values that leave nothing to search for mark the request as empty.

use serde::{Deserialize, Serialize};

use crate::model::{TypeTag, Visibility};

/// Query-string parameters exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSearchParams {
    pub q: Option<String>,
    pub types: Option<String>,
    pub domain: Option<String>,
    pub starts_with_char: Option<String>,
    pub category: Option<String>,
    pub import_job: Option<String>,
    pub external_system: Option<String>,
    pub kids: Option<String>,
    pub games: Option<String>,
    pub visibility: Option<String>,
    pub has_audio: Option<String>,
    pub has_document: Option<String>,
    pub has_image: Option<String>,
    pub has_video: Option<String>,
    pub has_translation: Option<String>,
    pub has_unrecognized_chars: Option<String>,
    pub has_categories: Option<String>,
    pub has_related_entries: Option<String>,
    pub has_site_feature: Option<String>,
    pub min_words: Option<String>,
    pub max_words: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// Outcome of validating a comma-separated set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection<T> {
    /// Nothing supplied; no restriction.
    All,
    Only(Vec<T>),
    /// Values were supplied but none was valid.
    Nothing,
}

impl<T> Selection<T> {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Selection::Nothing)
    }
}

/// Which text tiers a free-text term is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    Both,
    Language,
    Translation,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Both => "both",
            Domain::Language => "language",
            Domain::Translation => "translation",
        }
    }

    pub fn includes_language(self) -> bool {
        matches!(self, Domain::Both | Domain::Language)
    }

    pub fn includes_translation(self) -> bool {
        matches!(self, Domain::Both | Domain::Translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Relevance, then collation key, then raw title.
    #[default]
    Score,
    Created,
    Modified,
    Title,
    Random,
}

fn split_csv(input: &str) -> impl Iterator<Item = String> + '_ {
    input.split(',').map(|v| v.trim().to_lowercase())
}

/// Known type tags, deduplicated in input order.
pub fn valid_types(input: Option<&str>) -> Selection<TypeTag> {
    let Some(input) = input.filter(|s| !s.trim().is_empty()) else {
        return Selection::All;
    };
    let mut selected = Vec::new();
    for value in split_csv(input) {
        if let Ok(tag) = value.parse::<TypeTag>() {
            if !selected.contains(&tag) {
                selected.push(tag);
            }
        }
    }
    if selected.is_empty() {
        Selection::Nothing
    } else {
        Selection::Only(selected)
    }
}

/// `None` for an unknown domain; blank means both.
pub fn valid_domain(input: Option<&str>) -> Option<Domain> {
    match input.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("both") => Some(Domain::Both),
        Some("language") => Some(Domain::Language),
        Some("translation") => Some(Domain::Translation),
        Some(_) => None,
    }
}

/// Non-negative word count clamped to `max`. Anything else is ignored.
pub fn valid_count(input: Option<&str>, max: u32) -> Option<u32> {
    let value: i64 = input?.trim().parse().ok()?;
    if value < 0 {
        return None;
    }
    Some(value.min(i64::from(max)) as u32)
}

/// Only the literal strings `true` and `false` count.
pub fn valid_boolean(input: Option<&str>) -> Option<bool> {
    match input?.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// First word of the prefix; may span several graphemes.
pub fn valid_starts_with(input: Option<&str>) -> Option<String> {
    let word = input?.trim().split(' ').next()?.to_string();
    (!word.is_empty()).then_some(word)
}

pub fn valid_visibility(input: Option<&str>) -> Selection<Visibility> {
    let Some(input) = input.filter(|s| !s.trim().is_empty()) else {
        return Selection::All;
    };
    let mut selected = Vec::new();
    for value in split_csv(input) {
        if let Ok(visibility) = value.parse::<Visibility>() {
            if !selected.contains(&visibility) {
                selected.push(visibility);
            }
        }
    }
    if selected.is_empty() {
        Selection::Nothing
    } else {
        Selection::Only(selected)
    }
}

/// `{created|modified|title|random}` with an optional `_desc` suffix.
/// Unknown modes fall back to relevance.
pub fn valid_sort(input: Option<&str>) -> (SortMode, bool) {
    let Some(input) = input else {
        return (SortMode::Score, false);
    };
    let lowered = input.trim().to_lowercase();
    let mut parts = lowered.split('_');
    let mode = match parts.next() {
        Some("created") => SortMode::Created,
        Some("modified") => SortMode::Modified,
        Some("title") => SortMode::Title,
        Some("random") => SortMode::Random,
        _ => return (SortMode::Score, false),
    };
    let descending = parts.next() == Some("desc");
    (mode, descending)
}

/// Lowercased, deduplicated feature keys.
pub fn valid_site_features(input: Option<&str>) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for value in split_csv(input.unwrap_or_default()) {
        if !value.is_empty() && !selected.contains(&value) {
            selected.push(value);
        }
    }
    selected
}

/// Positive integer, or `fallback` for anything else.
pub fn valid_page_number(input: Option<&str>, fallback: usize) -> usize {
    let Some(input) = input else {
        return fallback;
    };
    let trimmed = input.trim();
    let parsed = trimmed.parse::<usize>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && *f >= 1.0)
            .map(|f| f as usize)
    });
    match parsed {
        Some(n) if n >= 1 => n,
        _ => fallback,
    }
}

/// Trimmed, or `None` when blank.
pub fn non_blank(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types() {
        assert_eq!(valid_types(None), Selection::All);
        assert_eq!(valid_types(Some("  ")), Selection::All);
        assert_eq!(
            valid_types(Some("word, Phrase,word,poem")),
            Selection::Only(vec![TypeTag::Word, TypeTag::Phrase])
        );
        assert_eq!(valid_types(Some("poem,novel")), Selection::Nothing);
    }

    #[test]
    fn test_domain() {
        assert_eq!(valid_domain(None), Some(Domain::Both));
        assert_eq!(valid_domain(Some(" Language ")), Some(Domain::Language));
        assert_eq!(valid_domain(Some("title")), None);
    }

    #[test]
    fn test_count() {
        assert_eq!(valid_count(Some("3"), 10), Some(3));
        assert_eq!(valid_count(Some("42"), 10), Some(10));
        assert_eq!(valid_count(Some("-1"), 10), None);
        assert_eq!(valid_count(Some("two"), 10), None);
        assert_eq!(valid_count(None, 10), None);
    }

    #[test]
    fn test_boolean() {
        assert_eq!(valid_boolean(Some("TRUE")), Some(true));
        assert_eq!(valid_boolean(Some("false")), Some(false));
        assert_eq!(valid_boolean(Some("1")), None);
        assert_eq!(valid_boolean(Some("yes")), None);
    }

    #[test]
    fn test_starts_with_takes_first_word() {
        assert_eq!(valid_starts_with(Some(" tl' a")), Some("tl'".to_string()));
        assert_eq!(valid_starts_with(Some("   ")), None);
    }

    #[test]
    fn test_visibility() {
        assert_eq!(valid_visibility(Some("")), Selection::All);
        assert_eq!(
            valid_visibility(Some("public,Team,public,secret")),
            Selection::Only(vec![Visibility::Public, Visibility::Team])
        );
        assert!(valid_visibility(Some("secret")).is_nothing());
    }

    #[test]
    fn test_sort() {
        assert_eq!(valid_sort(Some("created_desc")), (SortMode::Created, true));
        assert_eq!(valid_sort(Some("title")), (SortMode::Title, false));
        assert_eq!(valid_sort(Some("random")), (SortMode::Random, false));
        assert_eq!(valid_sort(Some("popularity_desc")), (SortMode::Score, false));
    }

    #[test]
    fn test_page_number() {
        assert_eq!(valid_page_number(Some("3"), 1), 3);
        assert_eq!(valid_page_number(Some("2.0"), 1), 2);
        assert_eq!(valid_page_number(Some("2.5"), 1), 1);
        assert_eq!(valid_page_number(Some("0"), 25), 25);
        assert_eq!(valid_page_number(Some("abc"), 25), 25);
    }

    #[test]
    fn test_site_features() {
        assert_eq!(
            valid_site_features(Some("Shared_Media, shared_media,kids")),
            vec!["shared_media".to_string(), "kids".to_string()]
        );
        assert!(valid_site_features(None).is_empty());
    }
}
