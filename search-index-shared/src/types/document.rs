//! Document types for the search index.
//!
//! This module defines the normalized document structure that crosses the
//! facade/adapter boundary. Adapters render it into their engine's wire format.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an indexable document.
///
/// Backends accept either textual or integer identifiers. Both render to the
/// same string form on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Integer(i64),
    Text(String),
}

impl DocumentId {
    /// Whether this identifier can be submitted to a backend.
    ///
    /// Integer identifiers are always valid; text identifiers must contain at
    /// least one non-whitespace character.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Integer(_) => true,
            Self::Text(id) => !id.trim().is_empty(),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(id) => write!(f, "{}", id),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl From<i64> for DocumentId {
    fn from(id: i64) -> Self {
        Self::Integer(id)
    }
}

/// A single field value.
///
/// Deserialization is untagged, so an RFC 3339 string arriving from JSON is
/// read back as `Text`; use [`FieldValue::Timestamp`] when building documents
/// in code to keep the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    TextList(Vec<String>),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Text content of this value, if it carries any.
    ///
    /// Lists are joined with a single space.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::TextList(items) => Some(items.join(" ")),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextList(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Document representation for the search index.
///
/// # Fields
///
/// - `id`: Unique identifier; must be non-empty when submitted for indexing
/// - `fields`: Content fields keyed by name
/// - `boost`: Optional relevance boost
/// - `indexed_at`: Optional timestamp; adapters stamp the write time when absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Create an empty document with the given identifier.
    ///
    /// # Example
    ///
    /// ```
    /// use search_index_shared::Document;
    ///
    /// let doc = Document::new("42").with_field("title", "hello");
    /// assert_eq!(doc.id.to_string(), "42");
    /// ```
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
            boost: None,
            indexed_at: None,
        }
    }

    /// Add or replace a content field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    pub fn with_indexed_at(mut self, indexed_at: DateTime<Utc>) -> Self {
        self.indexed_at = Some(indexed_at);
        self
    }

    /// Look up a content field by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Whether the document carries a usable identifier.
    pub fn has_valid_id(&self) -> bool {
        self.id.is_valid()
    }
}
