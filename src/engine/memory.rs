//! In-process search engine.
//!
//! Keeps every physical index in memory behind one lock. Writes land in a
//! live view and become searchable on [`SearchEngine::refresh`]; point reads
//! see live data. Text fields are analyzed by lowercasing and splitting on
//! Unicode word boundaries.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use unicode_segmentation::UnicodeSegmentation;

use crate::data::{FieldValue, IndexDocument};
use crate::engine::query::{
    BooleanQuery, EngineQuery, Occur, Query, RandomScore, SortClause, SortField, SortOrder,
    TermValue,
};
use crate::engine::{AliasAction, BulkResponse, Hit, IndexSpec, SearchEngine, SearchResponse};
use crate::error::{ArchiveError, Result};
use crate::schema::fields::SEQ_NO;

#[derive(Debug, Clone)]
struct StoredDocument {
    document: IndexDocument,
    seq_no: u64,
}

#[derive(Debug, Default)]
struct MemoryIndex {
    spec: IndexSpec,
    live: BTreeMap<String, StoredDocument>,
    searchable: BTreeMap<String, StoredDocument>,
    next_seq_no: u64,
}

impl MemoryIndex {
    fn write(&mut self, id: String, document: IndexDocument) {
        let seq_no = self.next_seq_no;
        self.next_seq_no += 1;
        self.live.insert(id, StoredDocument { document, seq_no });
    }
}

#[derive(Debug, Default)]
struct EngineState {
    indices: BTreeMap<String, MemoryIndex>,
    aliases: BTreeMap<String, BTreeSet<String>>,
}

impl EngineState {
    /// Physical indices behind a name; unknown names resolve to nothing.
    fn resolve(&self, target: &str) -> Vec<String> {
        if self.indices.contains_key(target) {
            return vec![target.to_string()];
        }
        self.aliases
            .get(target)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn resolve_write(&mut self, target: &str) -> Result<&mut MemoryIndex> {
        let resolved = self.resolve(target);
        match resolved.as_slice() {
            [name] => self
                .indices
                .get_mut(name)
                .ok_or_else(|| ArchiveError::not_found(format!("index '{name}'"))),
            [] => Err(ArchiveError::not_found(format!("index '{target}'"))),
            _ => Err(ArchiveError::engine(format!(
                "alias '{target}' points at {} indices and has no write index",
                resolved.len()
            ))),
        }
    }
}

/// In-memory [`SearchEngine`] with fault injection for tests.
#[derive(Debug)]
pub struct MemoryEngine {
    state: RwLock<EngineState>,
    available: AtomicBool,
    bulk_limit: Mutex<Option<usize>>,
    latency: Mutex<Option<Duration>>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        MemoryEngine {
            state: RwLock::new(EngineState::default()),
            available: AtomicBool::new(true),
            bulk_limit: Mutex::new(None),
            latency: Mutex::new(None),
        }
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost connection; every call fails while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Reject any bulk request that would grow an index past `limit` documents.
    pub fn fail_bulk_after(&self, limit: Option<usize>) {
        *self.bulk_limit.lock() = limit;
    }

    /// Delay every call, to exercise timeouts.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    pub fn index_names(&self) -> Vec<String> {
        self.state.read().indices.keys().cloned().collect()
    }

    pub fn index_spec(&self, name: &str) -> Option<IndexSpec> {
        self.state.read().indices.get(name).map(|i| i.spec.clone())
    }

    /// Live documents behind `target`, across every index it resolves to.
    pub fn documents(&self, target: &str) -> Vec<IndexDocument> {
        let state = self.state.read();
        state
            .resolve(target)
            .iter()
            .filter_map(|name| state.indices.get(name))
            .flat_map(|index| index.live.values().map(|s| s.document.clone()))
            .collect()
    }

    pub fn doc_count(&self, target: &str) -> usize {
        let state = self.state.read();
        state
            .resolve(target)
            .iter()
            .filter_map(|name| state.indices.get(name))
            .map(|index| index.live.len())
            .sum()
    }

    fn check(&self) -> Result<()> {
        if let Some(latency) = *self.latency.lock() {
            std::thread::sleep(latency);
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ArchiveError::unavailable("connection refused"))
        }
    }
}

impl SearchEngine for MemoryEngine {
    fn create_index(&self, name: &str, spec: &IndexSpec) -> Result<()> {
        self.check()?;
        let mut state = self.state.write();
        if state.indices.contains_key(name) || state.aliases.contains_key(name) {
            return Err(ArchiveError::engine(format!("index '{name}' already exists")));
        }
        state.indices.insert(
            name.to_string(),
            MemoryIndex {
                spec: spec.clone(),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn delete_index(&self, name: &str) -> Result<()> {
        self.check()?;
        let mut state = self.state.write();
        state.indices.remove(name);
        for members in state.aliases.values_mut() {
            members.remove(name);
        }
        state.aliases.retain(|_, members| !members.is_empty());
        Ok(())
    }

    fn index_exists(&self, name: &str) -> Result<bool> {
        self.check()?;
        Ok(self.state.read().indices.contains_key(name))
    }

    fn indices_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .indices
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn indices_for_alias(&self, alias: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .aliases
            .get(alias)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn update_aliases(&self, actions: &[AliasAction]) -> Result<()> {
        self.check()?;
        let mut state = self.state.write();

        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    if !state.indices.contains_key(index) {
                        return Err(ArchiveError::not_found(format!("index '{index}'")));
                    }
                    if state.indices.contains_key(alias) {
                        return Err(ArchiveError::engine(format!(
                            "alias '{alias}' clashes with an index name"
                        )));
                    }
                }
                AliasAction::Remove { index, alias } => {
                    let bound = state
                        .aliases
                        .get(alias)
                        .is_some_and(|set| set.contains(index));
                    if !bound {
                        return Err(ArchiveError::not_found(format!(
                            "alias '{alias}' on index '{index}'"
                        )));
                    }
                }
            }
        }

        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    state
                        .aliases
                        .entry(alias.clone())
                        .or_default()
                        .insert(index.clone());
                }
                AliasAction::Remove { index, alias } => {
                    if let Some(set) = state.aliases.get_mut(alias) {
                        set.remove(index);
                    }
                }
            }
        }
        state.aliases.retain(|_, members| !members.is_empty());
        Ok(())
    }

    fn put_document(&self, target: &str, document: IndexDocument) -> Result<()> {
        self.check()?;
        let id = document
            .id
            .clone()
            .ok_or_else(|| ArchiveError::invalid_argument("document has no id"))?;
        let mut state = self.state.write();
        state.resolve_write(target)?.write(id, document);
        Ok(())
    }

    fn update_document(&self, target: &str, id: &str, partial: IndexDocument) -> Result<()> {
        self.check()?;
        let mut state = self.state.write();
        let index = state.resolve_write(target)?;
        let mut document = index
            .live
            .get(id)
            .map(|s| s.document.clone())
            .ok_or_else(|| ArchiveError::not_found(format!("document '{id}' in '{target}'")))?;
        document.merge(partial);
        index.write(id.to_string(), document);
        Ok(())
    }

    fn delete_document(&self, target: &str, id: &str) -> Result<()> {
        self.check()?;
        let mut state = self.state.write();
        let index = state.resolve_write(target)?;
        match index.live.remove(id) {
            Some(_) => Ok(()),
            None => Err(ArchiveError::not_found(format!(
                "document '{id}' in '{target}'"
            ))),
        }
    }

    fn get_document(&self, target: &str, id: &str) -> Result<Option<IndexDocument>> {
        self.check()?;
        let state = self.state.read();
        Ok(state
            .resolve(target)
            .iter()
            .filter_map(|name| state.indices.get(name))
            .find_map(|index| index.live.get(id).map(|s| s.document.clone())))
    }

    fn search(&self, request: &EngineQuery) -> Result<SearchResponse> {
        self.check()?;
        let state = self.state.read();

        let names: BTreeSet<String> = request
            .indices
            .iter()
            .flat_map(|target| state.resolve(target))
            .collect();

        let mut hits = Vec::new();
        for name in &names {
            let Some(index) = state.indices.get(name) else {
                continue;
            };
            for (id, stored) in &index.searchable {
                if let Some(score) = evaluate(&request.query, stored) {
                    hits.push(Hit {
                        index: name.clone(),
                        id: id.clone(),
                        score,
                        source: stored.document.clone(),
                    });
                }
            }
        }

        hits.sort_by(|a, b| compare_hits(a, b, &request.sort));
        let total = hits.len();
        let hits = hits
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .collect();

        Ok(SearchResponse { hits, total })
    }

    fn bulk(&self, index: &str, documents: Vec<IndexDocument>) -> Result<BulkResponse> {
        self.check()?;
        let limit = *self.bulk_limit.lock();
        let mut state = self.state.write();
        let target = state
            .indices
            .get_mut(index)
            .ok_or_else(|| ArchiveError::not_found(format!("index '{index}'")))?;

        if let Some(limit) = limit {
            if target.live.len() + documents.len() > limit {
                return Err(ArchiveError::engine(format!(
                    "bulk rejected: index '{index}' is full"
                )));
            }
        }
        if documents.iter().any(|d| d.id.is_none()) {
            return Err(ArchiveError::invalid_argument("bulk document has no id"));
        }

        let indexed = documents.len();
        for document in documents {
            if let Some(id) = document.id.clone() {
                target.write(id, document);
            }
        }
        Ok(BulkResponse { indexed })
    }

    fn refresh(&self, target: &str) -> Result<()> {
        self.check()?;
        let mut state = self.state.write();
        for name in state.resolve(target) {
            if let Some(index) = state.indices.get_mut(&name) {
                index.searchable = index.live.clone();
            }
        }
        Ok(())
    }
}

fn analyze(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

fn string_values<'a>(document: &'a IndexDocument, field: &str) -> Vec<&'a str> {
    document
        .get(field)
        .map(FieldValue::texts)
        .unwrap_or_default()
}

fn term_matches(value: Option<&FieldValue>, term: &TermValue) -> bool {
    let Some(value) = value else {
        return false;
    };
    match (value, term) {
        (FieldValue::Int64(v), TermValue::Int(t)) => v == t,
        (FieldValue::Bool(v), TermValue::Bool(t)) => v == t,
        (value, TermValue::Str(t)) => value.texts().iter().any(|v| v == t),
        _ => false,
    }
}

fn integer_value(value: Option<&FieldValue>) -> Option<i64> {
    match value? {
        FieldValue::Int64(i) => Some(*i),
        FieldValue::DateTime(dt) => Some(dt.timestamp_micros()),
        _ => None,
    }
}

/// True when the query tokens occur in order with at most `slop` skipped positions.
fn phrase_matches(haystack: &[String], needle: &[String], slop: u32) -> bool {
    if needle.is_empty() {
        return false;
    }
    for start in 0..haystack.len() {
        if haystack[start] != needle[0] {
            continue;
        }
        let mut previous = start;
        let mut gaps = 0usize;
        let mut matched = true;
        for token in &needle[1..] {
            match haystack[previous + 1..].iter().position(|t| t == token) {
                Some(offset) => {
                    gaps += offset;
                    previous += offset + 1;
                }
                None => {
                    matched = false;
                    break;
                }
            }
        }
        if matched && gaps <= slop as usize {
            return true;
        }
    }
    false
}

pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut diagonal = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let above = row[j];
            let cost = usize::from(a[i - 1] != b[j - 1]);
            row[j] = (row[j] + 1).min(row[j - 1] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }
    row[b.len()]
}

fn random_score(random: &RandomScore, stored: &StoredDocument) -> f32 {
    let key = if random.field == SEQ_NO {
        stored.seq_no.to_string()
    } else {
        string_values(&stored.document, &random.field).concat()
    };
    let hasher = ahash::RandomState::with_seeds(random.seed, 0x5eed, 0xa11ce, 0xb0b);
    (hasher.hash_one(key) % 1_000_000) as f32 / 1_000_000.0
}

/// Score of `query` against one document, or `None` when it does not match.
fn evaluate(query: &Query, stored: &StoredDocument) -> Option<f32> {
    let document = &stored.document;
    match query {
        Query::Bool(bool_query) => evaluate_bool(bool_query, stored),
        Query::Term {
            field,
            value,
            boost,
        } => term_matches(document.get(field), value).then_some(*boost),
        Query::Terms { field, values } => values
            .iter()
            .any(|v| term_matches(document.get(field), v))
            .then_some(1.0),
        Query::Range { field, gte, lte } => {
            let value = integer_value(document.get(field))?;
            let above = gte.is_none_or(|min| value >= min);
            let below = lte.is_none_or(|max| value <= max);
            (above && below).then_some(1.0)
        }
        Query::Prefix { field, value } => {
            let matched = match document.get(field) {
                Some(FieldValue::Keyword(s)) => s.starts_with(value.as_str()),
                Some(other) => {
                    let prefix = value.to_lowercase();
                    other
                        .texts()
                        .iter()
                        .any(|text| analyze(text).iter().any(|t| t.starts_with(&prefix)))
                }
                None => false,
            };
            matched.then_some(1.0)
        }
        Query::MatchPhrase {
            field,
            query,
            slop,
            boost,
        } => {
            let needle = analyze(query);
            string_values(document, field)
                .iter()
                .any(|text| phrase_matches(&analyze(text), &needle, *slop))
                .then_some(*boost)
        }
        Query::MultiMatchPhrase {
            fields,
            query,
            slop,
            boost,
        } => {
            let needle = analyze(query);
            fields
                .iter()
                .flat_map(|field| string_values(document, field))
                .any(|text| phrase_matches(&analyze(text), &needle, *slop))
                .then_some(*boost)
        }
        Query::Fuzzy {
            field,
            value,
            fuzziness,
            boost,
        } => {
            let value = value.to_lowercase();
            string_values(document, field)
                .iter()
                .flat_map(|text| analyze(text))
                .map(|token| edit_distance(&token, &value))
                .filter(|d| *d <= *fuzziness as usize)
                .min()
                .map(|d| boost / (1 + d) as f32)
        }
        Query::Match {
            field,
            query,
            boost,
        } => {
            let wanted = analyze(query);
            if wanted.is_empty() {
                return None;
            }
            let present: BTreeSet<String> = string_values(document, field)
                .iter()
                .flat_map(|text| analyze(text))
                .collect();
            let found = wanted.iter().filter(|t| present.contains(*t)).count();
            (found > 0).then(|| boost * found as f32 / wanted.len() as f32)
        }
        Query::FunctionScore { query, random } => {
            evaluate(query, stored).map(|score| score.max(f32::EPSILON) * random_score(random, stored))
        }
        Query::MatchAll => Some(1.0),
        Query::MatchNone => None,
    }
}

fn evaluate_bool(query: &BooleanQuery, stored: &StoredDocument) -> Option<f32> {
    let mut score = 0.0;
    let mut required = 0;

    for clause in query.clauses_with(Occur::Must) {
        score += evaluate(clause, stored)?;
        required += 1;
    }
    for clause in query.clauses_with(Occur::Filter) {
        evaluate(clause, stored)?;
        required += 1;
    }
    if query
        .clauses_with(Occur::MustNot)
        .any(|clause| evaluate(clause, stored).is_some())
    {
        return None;
    }

    let mut should_matched = 0;
    let mut should_total = 0;
    for clause in query.clauses_with(Occur::Should) {
        should_total += 1;
        if let Some(s) = evaluate(clause, stored) {
            score += s;
            should_matched += 1;
        }
    }

    let minimum = if required == 0 && should_total > 0 {
        query.minimum_should_match.max(1)
    } else {
        query.minimum_should_match
    };
    if should_matched < minimum {
        return None;
    }

    if required == 0 && should_total == 0 && score == 0.0 {
        // Empty or must_not-only queries match everything.
        score = 1.0;
    }
    Some(score * query.boost)
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Int(i64),
    Str(String),
}

fn sort_value(document: &IndexDocument, field: &str) -> Option<SortValue> {
    match document.get(field)? {
        FieldValue::Int64(i) => Some(SortValue::Int(*i)),
        FieldValue::Bool(b) => Some(SortValue::Int(i64::from(*b))),
        FieldValue::DateTime(dt) => Some(SortValue::Int(dt.timestamp_micros())),
        FieldValue::Float64(f) => Some(SortValue::Int(*f as i64)),
        FieldValue::Keyword(s) | FieldValue::Text(s) => Some(SortValue::Str(s.clone())),
        FieldValue::List(items) => items.iter().min().cloned().map(SortValue::Str),
        FieldValue::Null => None,
    }
}

fn compare_hits(a: &Hit, b: &Hit, sort: &[SortClause]) -> CmpOrdering {
    let clauses: Vec<SortClause> = if sort.is_empty() {
        vec![SortClause::score()]
    } else {
        sort.to_vec()
    };

    for clause in &clauses {
        let ordering = match &clause.field {
            SortField::Score => {
                let ordering = a.score.partial_cmp(&b.score).unwrap_or(CmpOrdering::Equal);
                match clause.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            }
            SortField::Field(field) => {
                match (sort_value(&a.source, field), sort_value(&b.source, field)) {
                    (Some(x), Some(y)) => match clause.order {
                        SortOrder::Asc => x.cmp(&y),
                        SortOrder::Desc => y.cmp(&x),
                    },
                    // Missing values sort last in either direction.
                    (Some(_), None) => CmpOrdering::Less,
                    (None, Some(_)) => CmpOrdering::Greater,
                    (None, None) => CmpOrdering::Equal,
                }
            }
        };
        if ordering != CmpOrdering::Equal {
            return ordering;
        }
    }

    a.index.cmp(&b.index).then_with(|| a.id.cmp(&b.id))
}
