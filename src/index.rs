//! Index lifecycle: incremental writes and rebuild-with-cutover.
//!
//! Each [`IndexKind`] has one alias. Readers and incremental writers only ever
//! address the alias; a rebuild fills a fresh generation and moves the alias
//! in one atomic step.

pub mod lease;
pub mod manager;
pub mod outbox;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::IndexKind;

pub use lease::{PendingWrite, RebuildLease, RebuildLeases};
pub use manager::IndexManager;
pub use outbox::{ChangeKind, EntityChange, Outbox};

/// What an incremental write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    Indexed,
    Updated,
    Removed,

    /// The record does not belong in the index; nothing was written.
    Skipped,

    /// No index document matched the record.
    NotFound,

    /// The engine could not be reached; the write was dropped.
    Unavailable,
}

/// Summary of a completed rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub kind: IndexKind,
    pub alias: String,
    pub generation: String,

    /// Indices the alias pointed at before the cutover.
    pub previous: Vec<String>,

    /// Documents streamed from the store.
    pub indexed: usize,

    /// Records written during the rebuild and replayed before cutover.
    pub replayed: usize,

    /// Superseded generations removed after the cutover.
    pub deleted: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
