//! Per-alias rebuild leases.
//!
//! A lease makes rebuilds of one alias mutually exclusive and, while held,
//! collects the records written through that alias so the rebuild can replay
//! them into its new generation before cutting over.

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use parking_lot::{Condvar, Mutex};

use crate::error::{ArchiveError, Result};
use crate::model::{EntityId, RecordKind};

/// A record touched while a rebuild was running.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingWrite {
    pub kind: RecordKind,
    pub id: EntityId,
}

#[derive(Debug, Default)]
struct LeaseState {
    /// Writes seen since the lease was taken.
    pending: Vec<PendingWrite>,

    /// Set once the alias points at the new generation.
    cut_over: bool,
}

type SharedState = Arc<Mutex<LeaseState>>;

/// The registry lock only guards which aliases are leased; each lease has
/// its own state lock, so a cutover never stalls writers of other aliases.
#[derive(Debug, Default)]
pub struct RebuildLeases {
    held: Mutex<AHashMap<String, SharedState>>,
    released: Condvar,
}

impl RebuildLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease for `alias`, waiting up to `timeout` for a running
    /// rebuild to release it.
    pub fn acquire(&self, alias: &str, timeout: Duration) -> Result<RebuildLease<'_>> {
        let mut held = self.held.lock();
        if held.contains_key(alias) {
            let result = self
                .released
                .wait_while_for(&mut held, |held| held.contains_key(alias), timeout);
            if result.timed_out() && held.contains_key(alias) {
                return Err(ArchiveError::RebuildInProgress(alias.to_string()));
            }
        }
        let state = SharedState::default();
        held.insert(alias.to_string(), Arc::clone(&state));
        Ok(RebuildLease {
            leases: self,
            alias: alias.to_string(),
            state,
        })
    }

    pub fn is_held(&self, alias: &str) -> bool {
        self.held.lock().contains_key(alias)
    }

    /// Note a write through `alias`. Returns true when a rebuild will replay it.
    ///
    /// Blocks while the rebuild of this alias is cutting over.
    pub fn record(&self, alias: &str, kind: RecordKind, id: &str) -> bool {
        let Some(state) = self.held.lock().get(alias).cloned() else {
            return false;
        };
        let mut state = state.lock();
        if state.cut_over {
            return false;
        }
        state.pending.push(PendingWrite {
            kind,
            id: id.to_string(),
        });
        true
    }

    fn release(&self, alias: &str) {
        self.held.lock().remove(alias);
        self.released.notify_all();
    }
}

/// Held for the duration of one rebuild; released on drop.
pub struct RebuildLease<'a> {
    leases: &'a RebuildLeases,
    alias: String,
    state: SharedState,
}

impl RebuildLease<'_> {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Take the writes recorded so far, deduplicated in arrival order.
    pub fn drain(&self) -> Vec<PendingWrite> {
        dedup(std::mem::take(&mut self.state.lock().pending))
    }

    /// Run the final replay and the alias swap with writers of this alias
    /// held off.
    ///
    /// Writers that record before this point are in `pending`; writers that
    /// come later find the alias already moved and write to the new generation.
    pub fn cut_over<T>(
        &self,
        finish: impl FnOnce(Vec<PendingWrite>) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock();
        let pending = dedup(std::mem::take(&mut state.pending));
        let result = finish(pending);
        if result.is_ok() {
            state.cut_over = true;
        }
        result
    }
}

impl Drop for RebuildLease<'_> {
    fn drop(&mut self) {
        self.leases.release(&self.alias);
    }
}

fn dedup(writes: Vec<PendingWrite>) -> Vec<PendingWrite> {
    let mut seen = ahash::AHashSet::new();
    writes
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_times_out() {
        let leases = RebuildLeases::new();
        let _lease = leases.acquire("songs", Duration::ZERO).unwrap();
        let err = leases.acquire("songs", Duration::from_millis(10)).err().unwrap();
        assert!(matches!(err, ArchiveError::RebuildInProgress(alias) if alias == "songs"));
        assert!(leases.acquire("stories", Duration::ZERO).is_ok());
    }

    #[test]
    fn test_release_on_drop() {
        let leases = RebuildLeases::new();
        {
            let _lease = leases.acquire("songs", Duration::ZERO).unwrap();
            assert!(leases.is_held("songs"));
        }
        assert!(!leases.is_held("songs"));
        assert!(leases.acquire("songs", Duration::ZERO).is_ok());
    }

    #[test]
    fn test_records_only_while_held() {
        let leases = RebuildLeases::new();
        assert!(!leases.record("songs", RecordKind::Song, "1"));

        let lease = leases.acquire("songs", Duration::ZERO).unwrap();
        assert!(leases.record("songs", RecordKind::Song, "1"));
        assert!(leases.record("songs", RecordKind::Song, "1"));
        assert!(leases.record("songs", RecordKind::Song, "2"));
        assert_eq!(lease.drain().len(), 2);

        leases.record("songs", RecordKind::Song, "3");
        let replayed = lease.cut_over(|pending| Ok(pending.len())).unwrap();
        assert_eq!(replayed, 1);
        assert!(!leases.record("songs", RecordKind::Song, "4"));
    }

    #[test]
    fn test_cut_over_does_not_block_other_aliases() {
        let leases = RebuildLeases::new();
        let songs = leases.acquire("songs", Duration::ZERO).unwrap();
        let _stories = leases.acquire("stories", Duration::ZERO).unwrap();

        let recorded = songs
            .cut_over(|_| {
                Ok((
                    leases.record("stories", RecordKind::Story, "1"),
                    leases.record("media", RecordKind::Media(crate::model::MediaKind::Image), "1"),
                ))
            })
            .unwrap();
        assert_eq!(recorded, (true, false));
        assert!(leases.is_held("songs"));
    }
}
