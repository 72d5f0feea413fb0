use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value stored in a field of an index document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),

    /// Exact-match value: ids, type tags, collation keys.
    Keyword(String),

    /// Analyzed full-text value.
    Text(String),

    /// Multi-valued keyword or text field (categories, translations).
    List(Vec<String>),

    DateTime(DateTime<Utc>),
}

impl FieldValue {
    /// Returns the string value of a `Keyword` or `Text` field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Keyword(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float64(f) => Some(*f),
            FieldValue::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// All string values carried by the field; lists yield every element.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Keyword(s) => vec![s.as_str()],
            FieldValue::List(items) => items.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int64(v as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(dt: DateTime<Utc>) -> Self {
        FieldValue::DateTime(dt)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        FieldValue::List(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// A denormalized document as stored in the search engine.
///
/// `id` is the engine-side identifier. The domain id lives in the
/// `document_id` field, so the two can differ.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: Option<String>,
    pub fields: HashMap<String, FieldValue>,
}

impl IndexDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> IndexDocumentBuilder {
        IndexDocumentBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(FieldValue::as_boolean)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(FieldValue::as_integer)
    }

    /// Overwrite the fields present in `partial`, leaving the rest untouched.
    pub fn merge(&mut self, partial: IndexDocument) {
        for (name, value) in partial.fields {
            self.fields.insert(name, value);
        }
    }
}

#[derive(Debug, Default)]
pub struct IndexDocumentBuilder {
    document: IndexDocument,
}

impl IndexDocumentBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.document.id = Some(id.into());
        self
    }

    pub fn add_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.document.fields.insert(name.into(), value.into());
        self
    }

    pub fn add_keyword(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.document
            .fields
            .insert(name.into(), FieldValue::Keyword(value.into()));
        self
    }

    pub fn add_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.document
            .fields
            .insert(name.into(), FieldValue::Text(value.into()));
        self
    }

    pub fn add_list<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.document
            .fields
            .insert(name.into(), FieldValue::List(values));
        self
    }

    pub fn build(self) -> IndexDocument {
        self.document
    }
}
