//! Facade tying the store, the engine and the index lifecycle together.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collation::{
    Alphabet, Collation, CollationJobs, Collator, RecalculationMode, RecalculationReport, collate,
    site_alphabet,
};
use crate::config::ArchiveConfig;
use crate::engine::SearchEngine;
use crate::error::Result;
use crate::hydrate::{Hydrator, SearchResult};
use crate::index::{EntityChange, IndexManager, IndexOutcome, Outbox, RebuildReport};
use crate::model::{DictionaryEntry, Entity, RecordKind};
use crate::policy::{MembershipPolicy, Principal, VisibilityPolicy, VisibilityScope};
use crate::schema::IndexKind;
use crate::search::{CompiledSearch, QueryCompiler, RawSearchParams, SearchRequest};
use crate::store::SystemOfRecord;

/// One page of hydrated results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    /// Matches reported by the engine, before hydration drops anything.
    #[serde(rename = "count")]
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub pages: usize,
    pub next: Option<usize>,
    pub previous: Option<usize>,
}

impl SearchPage {
    fn new(results: Vec<SearchResult>, total_count: usize, page: usize, page_size: usize) -> Self {
        let pages = total_count.div_ceil(page_size.max(1));
        SearchPage {
            results,
            total_count,
            page,
            page_size,
            pages,
            next: (page < pages).then_some(page + 1),
            previous: (page > 1).then(|| page - 1),
        }
    }

    fn empty(page: usize, page_size: usize) -> Self {
        Self::new(Vec::new(), 0, page, page_size)
    }
}

/// Search and indexing entry point for a host application.
///
/// Searches propagate engine failures. Index writes triggered through the
/// service never fail because the engine is down; see [`IndexManager`].
pub struct SearchService {
    store: Arc<dyn SystemOfRecord>,
    manager: IndexManager,
    policy: Arc<dyn VisibilityPolicy>,
    collation: CollationJobs,
    config: ArchiveConfig,
}

impl SearchService {
    /// Create a service over `engine` and `store`.
    ///
    /// # Arguments
    ///
    /// * `engine` - Client for the search engine. Wrap it in a
    ///   [`crate::engine::TimeoutEngine`] to bound every call.
    /// * `store` - The system of record.
    /// * `config` - Paging, relevance and lifecycle settings.
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        store: Arc<dyn SystemOfRecord>,
        config: ArchiveConfig,
    ) -> Self {
        SearchService {
            manager: IndexManager::new(engine, Arc::clone(&store), &config),
            store,
            policy: Arc::new(MembershipPolicy),
            collation: CollationJobs::new(),
            config,
        }
    }

    /// Replace the default membership-based policy.
    pub fn with_policy(mut self, policy: Arc<dyn VisibilityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    /// Resolve the caller's scope and validate raw query parameters.
    pub fn request_for(
        &self,
        principal: &Principal,
        params: RawSearchParams,
        sites: &[String],
    ) -> Result<SearchRequest> {
        let scope = self.policy.scope(principal)?;
        let mut builder = SearchRequest::builder()
            .params(params)
            .scope(scope)
            .settings(self.config.search.clone());
        for site in sites {
            builder = builder.site(site.clone());
        }
        Ok(builder.build())
    }

    /// Run a search and hydrate the hits in rank order.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        // 1. Compile; structurally empty requests never reach the engine
        let compiler = QueryCompiler::new(
            self.store.as_ref(),
            self.manager.registry(),
            &self.config.search,
        );
        let query = match compiler.compile(request)? {
            CompiledSearch::Query(query) => query,
            CompiledSearch::Empty(reason) => {
                log::debug!("Search short-circuited: {reason:?}");
                return Ok(SearchPage::empty(request.page(), request.page_size()));
            }
        };

        // 2. Query the engine
        let response = self.manager.engine().search(&query)?;

        // 3. Hydrate
        let results = Hydrator::new(self.store.as_ref(), self.manager.registry())
            .hydrate(&response.hits, request.scope())?;

        Ok(SearchPage::new(
            results,
            response.total,
            request.page(),
            request.page_size(),
        ))
    }

    /// List or search languages and sites without a language.
    pub fn search_languages(
        &self,
        q: Option<&str>,
        page: usize,
        page_size: usize,
    ) -> Result<SearchPage> {
        let compiler = QueryCompiler::new(
            self.store.as_ref(),
            self.manager.registry(),
            &self.config.search,
        );
        let page = page.max(1);
        let page_size = page_size.clamp(1, self.config.search.max_page_size);
        let query = compiler.compile_languages(q, page, page_size);
        let response = self.manager.engine().search(&query)?;

        // The language index only holds discoverable records.
        let results = Hydrator::new(self.store.as_ref(), self.manager.registry())
            .hydrate(&response.hits, &VisibilityScope::admin())?;

        Ok(SearchPage::new(results, response.total, page, page_size))
    }

    pub fn add_to_index(&self, entity: &Entity) -> Result<IndexOutcome> {
        self.manager.add_to_index(entity)
    }

    pub fn update_in_index(&self, entity: &Entity) -> Result<IndexOutcome> {
        self.manager.update_in_index(entity)
    }

    pub fn remove_from_index(&self, entity: &Entity) -> Result<IndexOutcome> {
        self.manager.remove_from_index(entity)
    }

    pub fn sync_in_index(&self, kind: RecordKind, id: &str) -> Result<IndexOutcome> {
        self.manager.sync_in_index(kind, id)
    }

    pub fn rebuild(&self, kind: IndexKind) -> Result<RebuildReport> {
        self.manager.rebuild(kind)
    }

    pub fn rebuild_all(&self) -> Result<Vec<RebuildReport>> {
        self.manager.rebuild_all()
    }

    /// Apply the changes of a committed transaction. A failing change is
    /// logged and does not stop the others.
    pub fn flush_outbox(&self, outbox: Outbox) -> Vec<(EntityChange, Result<IndexOutcome>)> {
        outbox
            .into_changes()
            .into_iter()
            .map(|change| {
                let outcome = self.manager.apply_change(&change);
                if let Err(e) = &outcome {
                    log::error!(
                        "Could not apply {:?} of {} {}: {e}",
                        change.change,
                        change.record,
                        change.id
                    );
                }
                (change, outcome)
            })
            .collect()
    }

    /// Collate one title without touching the store.
    pub fn collate(&self, alphabet: &Alphabet, title: &str) -> Result<Collation> {
        collate(alphabet, title)
    }

    /// Clean a dictionary entry's title and set its order key from its site
    /// alphabet. Call whenever an entry is saved, before committing it.
    pub fn collate_entry(&self, entry: &mut DictionaryEntry) -> Result<Collation> {
        let alphabet = site_alphabet(self.store.as_ref(), &entry.meta.site.id)?;
        Ok(Collator::new(&alphabet)?.apply(entry))
    }

    /// Recalculate every dictionary entry of a site.
    ///
    /// In commit mode the changed entries are re-synced into the index, so
    /// `custom_order` in the index matches the stored value.
    pub fn recalculate(&self, site_id: &str, mode: RecalculationMode) -> Result<RecalculationReport> {
        let report = self.collation.run(self.store.as_ref(), site_id, mode)?;
        if mode == RecalculationMode::Commit {
            for entry_id in report.changed_ids() {
                self.manager
                    .sync_in_index(RecordKind::DictionaryEntry, entry_id)?;
            }
        }
        Ok(report)
    }

    pub fn latest_recalculation(
        &self,
        site_id: &str,
        mode: RecalculationMode,
    ) -> Option<RecalculationReport> {
        self.collation.latest(site_id, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_arithmetic() {
        let page = SearchPage::new(Vec::new(), 51, 2, 25);
        assert_eq!(page.pages, 3);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = SearchPage::new(Vec::new(), 50, 2, 25);
        assert_eq!(last.next, None);

        let empty = SearchPage::empty(1, 25);
        assert_eq!(empty.pages, 0);
        assert_eq!(empty.next, None);
        assert_eq!(empty.previous, None);
    }

    #[test]
    fn test_page_serializes_count() {
        let json = serde_json::to_value(SearchPage::new(Vec::new(), 3, 1, 25)).unwrap();
        assert_eq!(json["count"], 3);
        assert_eq!(json["pageSize"], 25);
    }
}
