//! Sort clauses and random-sort seeding.

use std::hash::BuildHasher;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::engine::{Query, RandomScore, SortClause};
use crate::schema::fields as f;
use crate::search::params::SortMode;

const SEED_MIN: u64 = 1000;
const SEED_SPAN: u64 = 9000;

/// Sort clauses for `mode`. Every mode ends with the collation key and then
/// the raw title so ties are deterministic.
pub fn sort_clauses(mode: SortMode, descending: bool) -> Vec<SortClause> {
    let mut clauses = match mode {
        SortMode::Score | SortMode::Random => vec![SortClause::score()],
        SortMode::Created => vec![SortClause::with_order(f::CREATED, descending)],
        SortMode::Modified => vec![SortClause::with_order(f::LAST_MODIFIED, descending)],
        SortMode::Title => Vec::new(),
    };
    clauses.push(SortClause::with_order(f::CUSTOM_ORDER, descending));
    clauses.push(SortClause::with_order(f::TITLE_RAW, descending));
    clauses
}

/// Seed for a random sort, in `1000..10000`.
///
/// Identical requests within the same `window_secs` bucket get the same seed,
/// so paging through a random order does not reshuffle between pages. A zero
/// window draws a fresh seed every time.
pub fn random_seed(fingerprint: &str, now: DateTime<Utc>, window_secs: u64) -> u64 {
    if window_secs == 0 {
        return rand::rng().random_range(SEED_MIN..SEED_MIN + SEED_SPAN);
    }
    let bucket = now.timestamp() as u64 / window_secs;
    let hasher = ahash::RandomState::with_seeds(0x51, 0x0e, 0xed, 0x5);
    SEED_MIN + hasher.hash_one((fingerprint, bucket)) % SEED_SPAN
}

/// Wrap `query` so its hits are scored by a seeded random function.
pub fn randomized(query: Query, seed: u64) -> Query {
    Query::FunctionScore {
        query: Box::new(query),
        random: RandomScore {
            seed,
            field: f::SEQ_NO.to_string(),
        },
    }
}
