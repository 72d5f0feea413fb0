//! Free-text relevance disjunction.

use crate::config::SearchSettings;
use crate::engine::{BooleanQuery, Query};
use crate::schema::fields as f;
use crate::search::params::Domain;

const EXACT_PRIMARY_BOOST: f32 = 5.0;
const EXACT_SECONDARY_BOOST: f32 = 4.0;
const FUZZY_PRIMARY_BOOST: f32 = 3.0;
const FUZZY_SECONDARY_BOOST: f32 = 2.0;
const EXACT_OTHER_BOOST: f32 = 1.5;
const FUZZY_OTHER_BOOST: f32 = 1.0;
const MULTI_FIELD_BOOST: f32 = 1.0;
const FULL_TEXT_BOOST: f32 = 0.5;

struct Tier {
    language: &'static str,
    translation: &'static str,
    exact_boost: f32,
    fuzzy_boost: f32,
}

const TIERS: [Tier; 3] = [
    Tier {
        language: f::PRIMARY_LANGUAGE,
        translation: f::PRIMARY_TRANSLATION,
        exact_boost: EXACT_PRIMARY_BOOST,
        fuzzy_boost: FUZZY_PRIMARY_BOOST,
    },
    Tier {
        language: f::SECONDARY_LANGUAGE,
        translation: f::SECONDARY_TRANSLATION,
        exact_boost: EXACT_SECONDARY_BOOST,
        fuzzy_boost: FUZZY_SECONDARY_BOOST,
    },
    Tier {
        language: f::OTHER_LANGUAGE,
        translation: f::OTHER_TRANSLATION,
        exact_boost: EXACT_OTHER_BOOST,
        fuzzy_boost: FUZZY_OTHER_BOOST,
    },
];

/// Build the scored disjunction for `term`; at least one clause must match.
///
/// Terms of `fuzzy_search_cutoff` characters or more only get exact-phrase
/// clauses. The multi-field phrase and the full-text fallback span both
/// domains and are only added for [`Domain::Both`].
pub fn text_query(term: &str, domain: Domain, settings: &SearchSettings) -> Query {
    let fuzzy = term.chars().count() < settings.fuzzy_search_cutoff;
    let mut query = BooleanQuery::new().with_minimum_should_match(1);

    let mut fields = Vec::new();
    if domain.includes_language() {
        fields.push(true);
    }
    if domain.includes_translation() {
        fields.push(false);
    }

    for tier in &TIERS {
        for &language in &fields {
            let field = if language { tier.language } else { tier.translation };
            query.add_should(Query::MatchPhrase {
                field: field.to_string(),
                query: term.to_string(),
                slop: settings.phrase_slop,
                boost: tier.exact_boost,
            });
        }
        if fuzzy {
            for &language in &fields {
                let field = if language { tier.language } else { tier.translation };
                query.add_should(Query::Fuzzy {
                    field: field.to_string(),
                    value: term.to_string(),
                    fuzziness: settings.fuzziness,
                    boost: tier.fuzzy_boost,
                });
            }
        }
    }

    if domain == Domain::Both {
        query.add_should(Query::MultiMatchPhrase {
            fields: vec![f::TITLE.to_string(), f::FULL_TEXT.to_string()],
            query: term.to_string(),
            slop: settings.phrase_slop,
            boost: MULTI_FIELD_BOOST,
        });
        query.add_should(Query::Match {
            field: f::FULL_TEXT.to_string(),
            query: term.to_string(),
            boost: FULL_TEXT_BOOST,
        });
    }

    Query::Bool(query)
}
