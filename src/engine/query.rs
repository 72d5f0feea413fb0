//! Structured engine query.
//!
//! The compiler builds these; engines evaluate them. The shape follows the
//! usual boolean query DSL: a [`BooleanQuery`] groups clauses, each with an
//! [`Occur`], and leaf queries match one field.

use serde::{Deserialize, Serialize};

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
    /// The clause must match but does not contribute to scoring.
    Filter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanClause {
    pub query: Query,
    pub occur: Occur,
}

impl BooleanClause {
    pub fn new(query: Query, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanQuery {
    pub clauses: Vec<BooleanClause>,
    pub boost: f32,
    /// Minimum number of should clauses that must match. With no must or
    /// filter clauses at least one should clause has to match regardless.
    pub minimum_should_match: usize,
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl BooleanQuery {
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            boost: 1.0,
            minimum_should_match: 0,
        }
    }

    pub fn add_clause(&mut self, clause: BooleanClause) {
        self.clauses.push(clause);
    }

    pub fn add_must(&mut self, query: Query) {
        self.add_clause(BooleanClause::new(query, Occur::Must));
    }

    pub fn add_should(&mut self, query: Query) {
        self.add_clause(BooleanClause::new(query, Occur::Should));
    }

    pub fn add_must_not(&mut self, query: Query) {
        self.add_clause(BooleanClause::new(query, Occur::MustNot));
    }

    pub fn add_filter(&mut self, query: Query) {
        self.add_clause(BooleanClause::new(query, Occur::Filter));
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn with_minimum_should_match(mut self, minimum: usize) -> Self {
        self.minimum_should_match = minimum;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses_with(&self, occur: Occur) -> impl Iterator<Item = &Query> {
        self.clauses
            .iter()
            .filter(move |c| c.occur == occur)
            .map(|c| &c.query)
    }
}

/// Exact value for term-level queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for TermValue {
    fn from(v: &str) -> Self {
        TermValue::Str(v.to_string())
    }
}

impl From<String> for TermValue {
    fn from(v: String) -> Self {
        TermValue::Str(v)
    }
}

impl From<i64> for TermValue {
    fn from(v: i64) -> Self {
        TermValue::Int(v)
    }
}

impl From<bool> for TermValue {
    fn from(v: bool) -> Self {
        TermValue::Bool(v)
    }
}

/// Random scoring seeded per request and keyed on a stable per-document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomScore {
    pub seed: u64,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Bool(BooleanQuery),
    Term {
        field: String,
        value: TermValue,
        boost: f32,
    },
    Terms {
        field: String,
        values: Vec<TermValue>,
    },
    /// Inclusive integer range.
    Range {
        field: String,
        gte: Option<i64>,
        lte: Option<i64>,
    },
    Prefix {
        field: String,
        value: String,
    },
    MatchPhrase {
        field: String,
        query: String,
        slop: u32,
        boost: f32,
    },
    /// Term-level fuzzy match; the value is not analyzed.
    Fuzzy {
        field: String,
        value: String,
        fuzziness: u32,
        boost: f32,
    },
    /// Analyzed match where any query token counts.
    Match {
        field: String,
        query: String,
        boost: f32,
    },
    MultiMatchPhrase {
        fields: Vec<String>,
        query: String,
        slop: u32,
        boost: f32,
    },
    FunctionScore {
        query: Box<Query>,
        random: RandomScore,
    },
    MatchAll,
    MatchNone,
}

impl Query {
    pub fn term(field: impl Into<String>, value: impl Into<TermValue>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
            boost: 1.0,
        }
    }

    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<TermValue>,
    {
        Query::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn gte(field: impl Into<String>, value: i64) -> Self {
        Query::Range {
            field: field.into(),
            gte: Some(value),
            lte: None,
        }
    }

    pub fn lte(field: impl Into<String>, value: i64) -> Self {
        Query::Range {
            field: field.into(),
            gte: None,
            lte: Some(value),
        }
    }

    pub fn prefix(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Prefix {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Conjunction of filters, none of which scores.
    pub fn all_of(queries: impl IntoIterator<Item = Query>) -> Self {
        let mut bool_query = BooleanQuery::new();
        for q in queries {
            bool_query.add_filter(q);
        }
        Query::Bool(bool_query)
    }

    /// Disjunction requiring at least one match.
    pub fn any_of(queries: impl IntoIterator<Item = Query>) -> Self {
        let mut bool_query = BooleanQuery::new().with_minimum_should_match(1);
        for q in queries {
            bool_query.add_should(q);
        }
        Query::Bool(bool_query)
    }

    pub fn is_match_none(&self) -> bool {
        matches!(self, Query::MatchNone)
    }

    /// Serialized form for debug logging.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Sort target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Score,
    Field(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortClause {
    pub fn score() -> Self {
        SortClause {
            field: SortField::Score,
            order: SortOrder::Desc,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        SortClause {
            field: SortField::Field(field.into()),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortClause {
            field: SortField::Field(field.into()),
            order: SortOrder::Desc,
        }
    }

    pub fn with_order(field: impl Into<String>, descending: bool) -> Self {
        if descending {
            Self::desc(field)
        } else {
            Self::asc(field)
        }
    }
}

/// A complete request against one or more aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineQuery {
    pub indices: Vec<String>,
    pub query: Query,
    pub sort: Vec<SortClause>,
    pub from: usize,
    pub size: usize,
}
