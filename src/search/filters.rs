//! Non-scoring filter clauses.

use crate::collation::Collator;
use crate::engine::Query;
use crate::model::{EntityId, TypeTag, Visibility};
use crate::policy::VisibilityScope;
use crate::schema::fields as f;
use crate::search::request::{PresenceFilters, SearchRequest};

/// Restricts hits to what the caller may see, or `None` for a bypassing scope.
///
/// Public content (public site and public record) is always allowed; each
/// grant adds its site down to the grant's ceiling.
pub fn visibility_filter(scope: &VisibilityScope) -> Option<Query> {
    if scope.bypass {
        return None;
    }
    let mut allowed: Vec<Query> = scope
        .grants
        .iter()
        .map(|grant| {
            Query::all_of([
                Query::term(f::SITE_ID, grant.site_id.as_str()),
                Query::gte(f::VISIBILITY, grant.ceiling.level()),
            ])
        })
        .collect();
    allowed.push(Query::all_of([
        Query::term(f::SITE_VISIBILITY, Visibility::Public.level()),
        Query::term(f::VISIBILITY, Visibility::Public.level()),
    ]));
    Some(Query::any_of(allowed))
}

pub fn types_filter(types: &[TypeTag]) -> Query {
    Query::terms(f::TYPE, types.iter().map(|t| t.as_str()))
}

/// Prefix on the order key when the alphabet knows every grapheme of the
/// prefix, otherwise on the analyzed title.
pub fn starts_with_filter(prefix: &str, collator: Option<&Collator>) -> Query {
    match collator.and_then(|c| c.prefix_key(prefix)) {
        Some(key) => Query::prefix(f::CUSTOM_ORDER, key),
        None => Query::prefix(f::TITLE, prefix),
    }
}

/// The category and its direct children.
pub fn category_filter(category_id: &str, children: Vec<EntityId>) -> Query {
    let mut ids = vec![category_id.to_string()];
    ids.extend(children);
    Query::terms(f::CATEGORIES, ids)
}

/// Every simple field filter carried by the request.
pub fn field_filters(request: &SearchRequest) -> Vec<Query> {
    let mut filters = Vec::new();

    if !request.sites().is_empty() {
        filters.push(Query::terms(f::SITE_ID, request.sites().iter().cloned()));
    }
    if let Some(import_job) = request.import_job() {
        filters.push(Query::term(f::IMPORT_JOB_ID, import_job));
    }
    if let Some(external_system) = request.external_system() {
        filters.push(Query::term(f::EXTERNAL_SYSTEM, external_system));
    }
    // Stored as exclusions, requested as inclusions.
    if let Some(kids) = request.kids() {
        filters.push(Query::term(f::EXCLUDE_FROM_KIDS, !kids));
    }
    if let Some(games) = request.games() {
        filters.push(Query::term(f::EXCLUDE_FROM_GAMES, !games));
    }
    if !request.visibility().is_empty() {
        filters.push(Query::terms(
            f::VISIBILITY,
            request.visibility().iter().map(|v| v.level()),
        ));
    }
    filters.extend(presence_filters(request.presence()));
    if !request.site_features().is_empty() {
        filters.push(Query::terms(
            f::SITE_FEATURES,
            request.site_features().iter().cloned(),
        ));
    }
    if let Some(min) = request.min_words() {
        filters.push(Query::gte(f::TITLE_TOKEN_COUNT, i64::from(min)));
    }
    if let Some(max) = request.max_words() {
        filters.push(Query::lte(f::TITLE_TOKEN_COUNT, i64::from(max)));
    }

    filters
}

fn presence_filters(presence: &PresenceFilters) -> Vec<Query> {
    [
        (f::HAS_AUDIO, presence.has_audio),
        (f::HAS_DOCUMENT, presence.has_document),
        (f::HAS_IMAGE, presence.has_image),
        (f::HAS_VIDEO, presence.has_video),
        (f::HAS_TRANSLATION, presence.has_translation),
        (f::HAS_UNRECOGNIZED_CHARS, presence.has_unrecognized_chars),
        (f::HAS_CATEGORIES, presence.has_categories),
        (f::HAS_RELATED_ENTRIES, presence.has_related_entries),
    ]
    .into_iter()
    .filter_map(|(field, value)| value.map(|v| Query::term(field, v)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collation::Alphabet;
    use crate::engine::{Occur, TermValue};

    #[test]
    fn test_admin_has_no_visibility_filter() {
        assert!(visibility_filter(&VisibilityScope::admin()).is_none());
    }

    #[test]
    fn test_visibility_filter_clauses() {
        let scope = VisibilityScope::public().with_grant("s1", Visibility::Team);
        let Some(Query::Bool(filter)) = visibility_filter(&scope) else {
            panic!("expected a bool filter");
        };
        assert_eq!(filter.clauses_with(Occur::Should).count(), 2);
        assert_eq!(filter.minimum_should_match, 1);
    }

    #[test]
    fn test_starts_with_uses_order_key_when_known() {
        let alphabet = Alphabet::from_graphemes("s1", ["a", "b", "tl'"]);
        let collator = Collator::new(&alphabet).unwrap();

        match starts_with_filter("tl'", Some(&collator)) {
            Query::Prefix { field, value } => {
                assert_eq!(field, f::CUSTOM_ORDER);
                assert_eq!(value, collator.order_key("tl'"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match starts_with_filter("x", Some(&collator)) {
            Query::Prefix { field, value } => {
                assert_eq!(field, f::TITLE);
                assert_eq!(value, "x");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_kids_filter_is_negated() {
        let request = SearchRequest::builder().kids(true).games(false).build();
        let filters = field_filters(&request);
        assert!(filters.contains(&Query::term(f::EXCLUDE_FROM_KIDS, false)));
        assert!(filters.contains(&Query::term(f::EXCLUDE_FROM_GAMES, true)));
    }

    #[test]
    fn test_category_includes_children() {
        match category_filter("c1", vec!["c2".into()]) {
            Query::Terms { field, values } => {
                assert_eq!(field, f::CATEGORIES);
                assert_eq!(
                    values,
                    vec![TermValue::from("c1"), TermValue::from("c2")]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
