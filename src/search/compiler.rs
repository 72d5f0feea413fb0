//! Turns a validated [`SearchRequest`] into one engine query.

use chrono::{DateTime, Utc};

use crate::collation::Collator;
use crate::collation::alphabet::normalize;
use crate::config::SearchSettings;
use crate::engine::{BooleanQuery, EngineQuery, Query, SortClause};
use crate::error::Result;
use crate::model::RecordKind;
use crate::schema::fields as f;
use crate::schema::{IndexKind, SchemaRegistry};
use crate::search::filters::{
    category_filter, field_filters, starts_with_filter, types_filter, visibility_filter,
};
use crate::search::params::SortMode;
use crate::search::request::{EmptyReason, SearchRequest};
use crate::search::sort::{random_seed, randomized, sort_clauses};
use crate::search::text::text_query;
use crate::store::SystemOfRecord;

/// Result of compiling a request.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledSearch {
    /// The request can match nothing; the engine is not asked.
    Empty(EmptyReason),
    Query(EngineQuery),
}

impl CompiledSearch {
    pub fn query(&self) -> Option<&EngineQuery> {
        match self {
            CompiledSearch::Query(query) => Some(query),
            CompiledSearch::Empty(_) => None,
        }
    }
}

pub struct QueryCompiler<'a> {
    store: &'a dyn SystemOfRecord,
    registry: &'a SchemaRegistry,
    settings: &'a SearchSettings,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(
        store: &'a dyn SystemOfRecord,
        registry: &'a SchemaRegistry,
        settings: &'a SearchSettings,
    ) -> Self {
        QueryCompiler {
            store,
            registry,
            settings,
        }
    }

    pub fn compile(&self, request: &SearchRequest) -> Result<CompiledSearch> {
        self.compile_at(request, Utc::now())
    }

    /// Compile with an explicit clock, which only matters for random sort.
    pub fn compile_at(&self, request: &SearchRequest, now: DateTime<Utc>) -> Result<CompiledSearch> {
        if let Some(reason) = request.empty_reason() {
            return Ok(CompiledSearch::Empty(reason));
        }

        let mut indices: Vec<String> = request
            .types()
            .iter()
            .map(|tag| self.registry.alias(IndexKind::for_type_tag(*tag)))
            .collect();
        indices.sort();
        indices.dedup();

        let mut root = BooleanQuery::new();
        if let Some(q) = request.q() {
            root.add_must(text_query(q, request.domain(), self.settings));
        }

        if let Some(filter) = visibility_filter(request.scope()) {
            root.add_filter(filter);
        }
        root.add_filter(types_filter(request.types()));
        for filter in field_filters(request) {
            root.add_filter(filter);
        }

        if let Some(prefix) = request.starts_with() {
            let collator = self.collator_for(request.sites().first().map(String::as_str))?;
            root.add_filter(starts_with_filter(prefix, collator.as_ref()));
        }

        if let Some(category_id) = request.category() {
            match self.store.category(category_id)? {
                Some(category)
                    if request.sites().is_empty() || request.sites().contains(&category.site_id) =>
                {
                    let children = self.store.child_categories(&category.id)?;
                    root.add_filter(category_filter(&category.id, children));
                }
                _ => return Ok(CompiledSearch::Empty(EmptyReason::UnknownCategory)),
            }
        }

        let mut query = Query::Bool(root);
        if request.sort() == SortMode::Random {
            let seed = request.random_seed().unwrap_or_else(|| {
                random_seed(
                    &request.fingerprint(),
                    now,
                    self.settings.random_seed_window_secs,
                )
            });
            query = randomized(query, seed);
        }

        let from = request.offset();
        let size = request
            .page_size()
            .min(self.settings.max_results.saturating_sub(from));

        let compiled = EngineQuery {
            indices,
            query,
            sort: sort_clauses(request.sort(), request.descending()),
            from,
            size,
        };
        log::debug!(
            "Compiled search over {:?}: {}",
            compiled.indices,
            compiled.query.to_json()
        );
        Ok(CompiledSearch::Query(compiled))
    }

    /// Query the language index: everything when `q` is blank, ordered by
    /// name, otherwise a match over names, codes, keywords and site names.
    pub fn compile_languages(&self, q: Option<&str>, page: usize, page_size: usize) -> EngineQuery {
        let term = q
            .map(|q| normalize(q).to_lowercase())
            .filter(|q| !q.is_empty());
        let page = page.max(1);
        let page_size = page_size.clamp(1, self.settings.max_page_size);
        let from = (page - 1).saturating_mul(page_size);

        let (query, sort) = match term {
            None => (
                Query::terms(
                    f::DOCUMENT_TYPE,
                    [RecordKind::Language.to_string(), RecordKind::Site.to_string()],
                ),
                vec![SortClause::asc(f::SORT_TITLE)],
            ),
            Some(term) => (
                language_text_query(&term),
                vec![SortClause::score(), SortClause::asc(f::SORT_TITLE)],
            ),
        };

        EngineQuery {
            indices: vec![self.registry.alias(IndexKind::Language)],
            query,
            sort,
            from,
            size: page_size.min(self.settings.max_results.saturating_sub(from)),
        }
    }

    /// Collator for the first requested site, if it has a usable alphabet.
    fn collator_for(&self, site_id: Option<&str>) -> Result<Option<Collator>> {
        let Some(site_id) = site_id else {
            return Ok(None);
        };
        let Some(alphabet) = self.store.alphabet(site_id)? else {
            return Ok(None);
        };
        match Collator::new(&alphabet) {
            Ok(collator) => Ok(Some(collator)),
            Err(e) => {
                log::warn!("Alphabet of site {site_id} is unusable, prefix falls back to title: {e}");
                Ok(None)
            }
        }
    }
}

const LANGUAGE_FIELDS: [(&str, f32); 8] = [
    (f::LANGUAGE_NAME, 5.0),
    (f::LANGUAGE_CODE, 4.0),
    (f::LANGUAGE_ALTERNATE_NAMES, 3.0),
    (f::SITE_NAMES, 3.0),
    (f::SITE_SLUGS, 2.0),
    (f::LANGUAGE_COMMUNITY_KEYWORDS, 2.0),
    (f::LANGUAGE_FAMILY_NAME, 1.0),
    (f::LANGUAGE_FAMILY_ALTERNATE_NAMES, 1.0),
];

fn language_text_query(term: &str) -> Query {
    let mut query = BooleanQuery::new().with_minimum_should_match(1);
    for (field, boost) in LANGUAGE_FIELDS {
        query.add_should(Query::Match {
            field: field.to_string(),
            query: term.to_string(),
            boost,
        });
    }
    Query::Bool(query)
}
