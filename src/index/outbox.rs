//! Post-commit index side effects.
//!
//! Each transaction records what it changed in the system of record in its
//! own outbox and flushes it once the transaction has committed. Nothing is
//! sent to the engine for a transaction that rolled back.

use serde::{Deserialize, Serialize};

use crate::model::{EntityId, RecordKind, SiteId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Created or saved; the index is re-synced from the store.
    Upsert,
    Delete,
    /// A site's visibility changed; every record of the site is re-synced.
    SiteVisibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityChange {
    pub record: RecordKind,
    pub id: EntityId,
    pub change: ChangeKind,
}

impl EntityChange {
    pub fn upsert(record: RecordKind, id: impl Into<EntityId>) -> Self {
        EntityChange {
            record,
            id: id.into(),
            change: ChangeKind::Upsert,
        }
    }

    pub fn delete(record: RecordKind, id: impl Into<EntityId>) -> Self {
        EntityChange {
            record,
            id: id.into(),
            change: ChangeKind::Delete,
        }
    }

    pub fn site_visibility(site_id: impl Into<SiteId>) -> Self {
        EntityChange {
            record: RecordKind::Site,
            id: site_id.into(),
            change: ChangeKind::SiteVisibility,
        }
    }
}

/// Changes recorded by one unit of work, waiting for its transaction to
/// commit.
///
/// Create one per transaction. Hand it to
/// [`SearchService::flush_outbox`](crate::service::SearchService::flush_outbox)
/// after the commit, or [`discard`](Self::discard) it on rollback; other
/// transactions never see its changes.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<EntityChange>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, change: EntityChange) {
        self.pending.push(change);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything recorded; used when the transaction rolls back.
    pub fn discard(self) {
        if !self.pending.is_empty() {
            log::debug!("Discarded {} index changes of a rolled-back transaction", self.pending.len());
        }
    }

    /// The recorded changes, keeping only the last change per record.
    pub fn into_changes(self) -> Vec<EntityChange> {
        let mut latest: Vec<EntityChange> = Vec::with_capacity(self.pending.len());
        for change in self.pending {
            latest.retain(|c| !(c.record == change.record && c.id == change.id));
            latest.push(change);
        }
        latest
    }
}
