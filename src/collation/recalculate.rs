//! Bulk recalculation of dictionary titles and order keys for one site.

use std::collections::{BTreeMap, HashMap};

use ahash::AHashSet;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::collation::{Alphabet, Collator};
use crate::error::{ArchiveError, Result};
use crate::model::{EntityId, SiteId};
use crate::store::SystemOfRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecalculationMode {
    /// Report what would change without persisting anything.
    Preview,
    /// Persist cleaned titles and order keys.
    Commit,
}

/// One entry whose title or order key differs from the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryChange {
    pub entry_id: EntityId,
    pub title: String,
    /// Empty unless the title changed.
    pub cleaned_title: String,
    pub is_title_updated: bool,
    pub previous_custom_order: String,
    /// Empty unless the order key changed.
    pub new_custom_order: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculationReport {
    pub site_id: SiteId,
    pub mode: RecalculationMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub updated_entries: Vec<EntryChange>,
    pub unknown_character_count: BTreeMap<String, usize>,
}

impl RecalculationReport {
    pub fn changed_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.updated_entries.iter().map(|e| &e.entry_id)
    }
}

/// Recalculate every dictionary entry of `alphabet.site_id`.
///
/// Commit mode stores the cleaned title and key through
/// [`SystemOfRecord::save_collation`], which bumps the system-modified
/// timestamp only.
pub fn recalculate(
    store: &dyn SystemOfRecord,
    alphabet: &Alphabet,
    mode: RecalculationMode,
) -> Result<RecalculationReport> {
    let started_at = Utc::now();
    let collator = Collator::new(alphabet)?;

    let mut updated_entries = Vec::new();
    let mut unknown_character_count = BTreeMap::new();

    for entry in store.dictionary_entries(&alphabet.site_id)? {
        let collation = collator.clean(&entry.meta.title);

        for (grapheme, count) in &collation.unknown_counts {
            *unknown_character_count.entry(grapheme.clone()).or_insert(0) += count;
        }

        if mode == RecalculationMode::Commit {
            store.save_collation(
                &entry.meta.id,
                &collation.cleaned_title,
                &collation.order_key,
                Utc::now(),
            )?;
        }

        let key_changed = collation.order_key != entry.custom_order;
        let title_changed = collation.cleaned_title != entry.meta.title;
        if key_changed || title_changed {
            updated_entries.push(EntryChange {
                entry_id: entry.meta.id.clone(),
                title: entry.meta.title.clone(),
                cleaned_title: if title_changed {
                    collation.cleaned_title.clone()
                } else {
                    String::new()
                },
                is_title_updated: title_changed,
                previous_custom_order: entry.custom_order.clone(),
                new_custom_order: if key_changed {
                    collation.order_key
                } else {
                    String::new()
                },
            });
        }
    }

    Ok(RecalculationReport {
        site_id: alphabet.site_id.clone(),
        mode,
        started_at,
        finished_at: Utc::now(),
        updated_entries,
        unknown_character_count,
    })
}

/// The alphabet of `site_id`, or an empty one when the site has none.
pub fn site_alphabet(store: &dyn SystemOfRecord, site_id: &str) -> Result<Alphabet> {
    match store.alphabet(site_id)? {
        Some(alphabet) => Ok(alphabet),
        None => {
            log::warn!("No alphabet for site {site_id}; every grapheme is unknown");
            Ok(Alphabet::new(site_id))
        }
    }
}

/// Runs recalculation jobs, at most one per site, and keeps the latest
/// report per site and mode.
#[derive(Debug, Default)]
pub struct CollationJobs {
    running: Mutex<AHashSet<SiteId>>,
    latest: RwLock<HashMap<(SiteId, RecalculationMode), RecalculationReport>>,
}

impl CollationJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a job for `site_id`. A busy site is rejected with
    /// [`ArchiveError::CollationJobInProgress`].
    pub fn run(
        &self,
        store: &dyn SystemOfRecord,
        site_id: &str,
        mode: RecalculationMode,
    ) -> Result<RecalculationReport> {
        let _guard = self.try_start(site_id)?;

        let alphabet = site_alphabet(store, site_id)?;

        log::info!("Recalculating order keys for site {site_id} ({mode:?})");
        let report = recalculate(store, &alphabet, mode)?;
        log::info!(
            "Recalculation for site {site_id} finished: {} entries changed, {} unknown graphemes",
            report.updated_entries.len(),
            report.unknown_character_count.len()
        );

        self.latest
            .write()
            .insert((site_id.to_string(), mode), report.clone());
        Ok(report)
    }

    pub fn latest(&self, site_id: &str, mode: RecalculationMode) -> Option<RecalculationReport> {
        self.latest
            .read()
            .get(&(site_id.to_string(), mode))
            .cloned()
    }

    pub fn is_running(&self, site_id: &str) -> bool {
        self.running.lock().contains(site_id)
    }

    fn try_start(&self, site_id: &str) -> Result<JobGuard<'_>> {
        let mut running = self.running.lock();
        if !running.insert(site_id.to_string()) {
            return Err(ArchiveError::CollationJobInProgress(site_id.to_string()));
        }
        Ok(JobGuard {
            jobs: self,
            site_id: site_id.to_string(),
        })
    }
}

struct JobGuard<'a> {
    jobs: &'a CollationJobs,
    site_id: SiteId,
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.jobs.running.lock().remove(&self.site_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_site_rejected() {
        let jobs = CollationJobs::new();
        let guard = jobs.try_start("s1").unwrap();
        assert!(jobs.is_running("s1"));
        assert!(matches!(
            jobs.try_start("s1"),
            Err(ArchiveError::CollationJobInProgress(_))
        ));
        assert!(jobs.try_start("s2").is_ok());
        drop(guard);
        assert!(!jobs.is_running("s1"));
        assert!(jobs.try_start("s1").is_ok());
    }
}
