use serde::{Deserialize, Serialize};

use crate::collation::alphabet::normalize;
use crate::config::SearchSettings;
use crate::model::{SiteId, TypeTag, Visibility};
use crate::policy::VisibilityScope;
use crate::search::params::{
    Domain, RawSearchParams, Selection, SortMode, non_blank, valid_boolean, valid_count,
    valid_domain, valid_page_number, valid_site_features, valid_sort, valid_starts_with,
    valid_types, valid_visibility,
};

/// Why a request can match nothing without asking the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    NoValidTypes,
    UnknownDomain,
    NoValidVisibility,
    InvertedWordRange,
    UnknownCategory,
}

/// Tri-state presence filters; `None` leaves the field unfiltered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceFilters {
    pub has_audio: Option<bool>,
    pub has_document: Option<bool>,
    pub has_image: Option<bool>,
    pub has_video: Option<bool>,
    pub has_translation: Option<bool>,
    pub has_unrecognized_chars: Option<bool>,
    pub has_categories: Option<bool>,
    pub has_related_entries: Option<bool>,
}

/// A validated, immutable search request.
///
/// Built once through [`SearchRequestBuilder`]; every option has already been
/// normalized, so compilation never has to reject anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    q: Option<String>,
    sites: Vec<SiteId>,
    types: Vec<TypeTag>,
    domain: Domain,
    starts_with: Option<String>,
    category: Option<String>,
    import_job: Option<String>,
    external_system: Option<String>,
    kids: Option<bool>,
    games: Option<bool>,
    visibility: Vec<Visibility>,
    presence: PresenceFilters,
    site_features: Vec<String>,
    min_words: Option<u32>,
    max_words: Option<u32>,
    sort: SortMode,
    descending: bool,
    random_seed: Option<u64>,
    page: usize,
    page_size: usize,
    scope: VisibilityScope,
    empty: Option<EmptyReason>,
}

impl SearchRequest {
    pub fn builder() -> SearchRequestBuilder {
        SearchRequestBuilder::default()
    }

    pub fn from_params(
        params: RawSearchParams,
        scope: VisibilityScope,
        settings: &SearchSettings,
    ) -> Self {
        SearchRequestBuilder::default()
            .params(params)
            .scope(scope)
            .settings(settings.clone())
            .build()
    }

    /// Cleaned, lowercased search term.
    pub fn q(&self) -> Option<&str> {
        self.q.as_deref()
    }

    pub fn sites(&self) -> &[SiteId] {
        &self.sites
    }

    pub fn types(&self) -> &[TypeTag] {
        &self.types
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn starts_with(&self) -> Option<&str> {
        self.starts_with.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn import_job(&self) -> Option<&str> {
        self.import_job.as_deref()
    }

    pub fn external_system(&self) -> Option<&str> {
        self.external_system.as_deref()
    }

    pub fn kids(&self) -> Option<bool> {
        self.kids
    }

    pub fn games(&self) -> Option<bool> {
        self.games
    }

    /// Explicit visibility tiers; empty means no tier filter.
    pub fn visibility(&self) -> &[Visibility] {
        &self.visibility
    }

    pub fn presence(&self) -> &PresenceFilters {
        &self.presence
    }

    pub fn site_features(&self) -> &[String] {
        &self.site_features
    }

    pub fn min_words(&self) -> Option<u32> {
        self.min_words
    }

    pub fn max_words(&self) -> Option<u32> {
        self.max_words
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn descending(&self) -> bool {
        self.descending
    }

    pub fn random_seed(&self) -> Option<u64> {
        self.random_seed
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Offset of the first hit on this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn scope(&self) -> &VisibilityScope {
        &self.scope
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        self.empty
    }

    pub fn is_empty(&self) -> bool {
        self.empty.is_some()
    }

    /// Stable text of everything but the paging window.
    pub fn fingerprint(&self) -> String {
        let unpaged = SearchRequest {
            page: 1,
            page_size: 0,
            ..self.clone()
        };
        serde_json::to_string(&unpaged).unwrap_or_else(|_| format!("{unpaged:?}"))
    }
}

/// Collects raw parameters and validates them once in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct SearchRequestBuilder {
    params: RawSearchParams,
    sites: Vec<SiteId>,
    scope: VisibilityScope,
    settings: SearchSettings,
    random_seed: Option<u64>,
}

fn flag(value: bool) -> Option<String> {
    Some(value.to_string())
}

impl SearchRequestBuilder {
    pub fn params(mut self, params: RawSearchParams) -> Self {
        self.params = params;
        self
    }

    pub fn settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn scope(mut self, scope: VisibilityScope) -> Self {
        self.scope = scope;
        self
    }

    /// Restrict to one site; may be called repeatedly.
    pub fn site(mut self, site_id: impl Into<SiteId>) -> Self {
        self.sites.push(site_id.into());
        self
    }

    pub fn q(mut self, q: impl Into<String>) -> Self {
        self.params.q = Some(q.into());
        self
    }

    /// Comma-separated type tags.
    pub fn types(mut self, types: impl Into<String>) -> Self {
        self.params.types = Some(types.into());
        self
    }

    pub fn type_tags(self, tags: impl IntoIterator<Item = TypeTag>) -> Self {
        let joined = tags
            .into_iter()
            .map(TypeTag::as_str)
            .collect::<Vec<_>>()
            .join(",");
        self.types(joined)
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.params.domain = Some(domain.into());
        self
    }

    pub fn starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.params.starts_with_char = Some(prefix.into());
        self
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.params.category = Some(category_id.into());
        self
    }

    pub fn import_job(mut self, import_job_id: impl Into<String>) -> Self {
        self.params.import_job = Some(import_job_id.into());
        self
    }

    pub fn external_system(mut self, external_system: impl Into<String>) -> Self {
        self.params.external_system = Some(external_system.into());
        self
    }

    pub fn kids(mut self, kids: bool) -> Self {
        self.params.kids = flag(kids);
        self
    }

    pub fn games(mut self, games: bool) -> Self {
        self.params.games = flag(games);
        self
    }

    /// Comma-separated visibility tiers.
    pub fn visibility(mut self, visibility: impl Into<String>) -> Self {
        self.params.visibility = Some(visibility.into());
        self
    }

    pub fn has_audio(mut self, value: bool) -> Self {
        self.params.has_audio = flag(value);
        self
    }

    pub fn has_document(mut self, value: bool) -> Self {
        self.params.has_document = flag(value);
        self
    }

    pub fn has_image(mut self, value: bool) -> Self {
        self.params.has_image = flag(value);
        self
    }

    pub fn has_video(mut self, value: bool) -> Self {
        self.params.has_video = flag(value);
        self
    }

    pub fn has_translation(mut self, value: bool) -> Self {
        self.params.has_translation = flag(value);
        self
    }

    pub fn has_unrecognized_chars(mut self, value: bool) -> Self {
        self.params.has_unrecognized_chars = flag(value);
        self
    }

    pub fn has_categories(mut self, value: bool) -> Self {
        self.params.has_categories = flag(value);
        self
    }

    pub fn has_related_entries(mut self, value: bool) -> Self {
        self.params.has_related_entries = flag(value);
        self
    }

    /// Comma-separated site feature keys.
    pub fn site_features(mut self, features: impl Into<String>) -> Self {
        self.params.has_site_feature = Some(features.into());
        self
    }

    pub fn min_words(mut self, count: impl ToString) -> Self {
        self.params.min_words = Some(count.to_string());
        self
    }

    pub fn max_words(mut self, count: impl ToString) -> Self {
        self.params.max_words = Some(count.to_string());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.params.sort = Some(sort.into());
        self
    }

    /// Pin the random-sort seed instead of deriving it from the request.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn page(mut self, page: impl ToString) -> Self {
        self.params.page = Some(page.to_string());
        self
    }

    pub fn page_size(mut self, page_size: impl ToString) -> Self {
        self.params.page_size = Some(page_size.to_string());
        self
    }

    pub fn build(self) -> SearchRequest {
        let p = &self.params;
        let settings = &self.settings;
        let mut empty = None;

        let q = p
            .q
            .as_deref()
            .map(|q| normalize(q).to_lowercase())
            .filter(|q| !q.is_empty());

        let types = match valid_types(p.types.as_deref()) {
            Selection::All => TypeTag::ALL.to_vec(),
            Selection::Only(types) => types,
            Selection::Nothing => {
                empty = empty.or(Some(EmptyReason::NoValidTypes));
                Vec::new()
            }
        };

        let domain = valid_domain(p.domain.as_deref()).unwrap_or_else(|| {
            empty = empty.or(Some(EmptyReason::UnknownDomain));
            Domain::Both
        });

        let visibility = match valid_visibility(p.visibility.as_deref()) {
            Selection::All => Vec::new(),
            Selection::Only(levels) => levels,
            Selection::Nothing => {
                empty = empty.or(Some(EmptyReason::NoValidVisibility));
                Vec::new()
            }
        };

        let min_words = valid_count(p.min_words.as_deref(), settings.length_filter_max);
        let max_words = valid_count(p.max_words.as_deref(), settings.length_filter_max);
        if let (Some(min), Some(max)) = (min_words, max_words) {
            if max < min {
                empty = empty.or(Some(EmptyReason::InvertedWordRange));
            }
        }

        let (sort, descending) = valid_sort(p.sort.as_deref());
        let page = valid_page_number(p.page.as_deref(), 1);
        let page_size = valid_page_number(p.page_size.as_deref(), settings.page_size)
            .min(settings.max_page_size);

        let mut sites = Vec::new();
        for site in self.sites {
            if !sites.contains(&site) {
                sites.push(site);
            }
        }

        SearchRequest {
            q,
            sites,
            types,
            domain,
            starts_with: valid_starts_with(p.starts_with_char.as_deref()),
            category: non_blank(p.category.as_deref()),
            import_job: non_blank(p.import_job.as_deref()),
            external_system: non_blank(p.external_system.as_deref()),
            kids: valid_boolean(p.kids.as_deref()),
            games: valid_boolean(p.games.as_deref()),
            visibility,
            presence: PresenceFilters {
                has_audio: valid_boolean(p.has_audio.as_deref()),
                has_document: valid_boolean(p.has_document.as_deref()),
                has_image: valid_boolean(p.has_image.as_deref()),
                has_video: valid_boolean(p.has_video.as_deref()),
                has_translation: valid_boolean(p.has_translation.as_deref()),
                has_unrecognized_chars: valid_boolean(p.has_unrecognized_chars.as_deref()),
                has_categories: valid_boolean(p.has_categories.as_deref()),
                has_related_entries: valid_boolean(p.has_related_entries.as_deref()),
            },
            site_features: valid_site_features(p.has_site_feature.as_deref()),
            min_words,
            max_words,
            sort,
            descending,
            random_seed: self.random_seed,
            page,
            page_size,
            scope: self.scope,
            empty,
        }
    }
}
