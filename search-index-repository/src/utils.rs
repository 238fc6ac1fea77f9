//! Utility functions shared by the adapter implementations.

use std::future::Future;

use chrono::{DateTime, SecondsFormat, Utc};
use search_index_shared::{Document, FieldValue};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{Result, SearchIndexError};
use crate::types::IndexSummary;

/// Validate that every document carries a usable identifier.
///
/// Adapters call this before any network request so that a malformed batch is
/// rejected as a whole.
///
/// # Example
///
/// ```
/// use search_index_repository::utils::validate_documents;
/// use search_index_shared::Document;
///
/// assert!(validate_documents(&[Document::new("42")]).is_ok());
/// assert!(validate_documents(&[Document::new("")]).is_err());
/// ```
pub fn validate_documents(documents: &[Document]) -> Result<()> {
    for (position, document) in documents.iter().enumerate() {
        if !document.has_valid_id() {
            return Err(SearchIndexError::validation(format!(
                "Document at position {} has an empty identifier",
                position
            )));
        }
    }
    Ok(())
}

/// Render a document into a flat JSON object for a backend.
///
/// The identifier is written to `id_field` as a string, the boost (if any) to
/// `boost`, and `indexed_at` (or `now` when absent) to `timestamp_field`.
/// Content fields may not reuse those reserved names.
pub fn render_document(
    document: &Document,
    id_field: &str,
    timestamp_field: &str,
    now: DateTime<Utc>,
) -> Result<Map<String, Value>> {
    let mut rendered = Map::new();

    for (name, value) in &document.fields {
        if name == id_field || name == timestamp_field || name == "boost" {
            return Err(SearchIndexError::validation(format!(
                "Document {} uses reserved field name '{}'",
                document.id, name
            )));
        }
        rendered.insert(name.clone(), render_value(value)?);
    }

    rendered.insert(id_field.to_string(), Value::String(document.id.to_string()));
    if let Some(boost) = document.boost {
        rendered.insert("boost".to_string(), finite_number(f64::from(boost))?);
    }
    rendered.insert(
        timestamp_field.to_string(),
        Value::String(format_timestamp(document.indexed_at.unwrap_or(now))),
    );

    Ok(rendered)
}

/// A document already rendered for the wire, keyed by its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub id: String,
    pub body: Map<String, Value>,
}

/// Validate and render a whole batch before any network call.
///
/// Either every document renders or the batch is rejected.
pub fn render_documents(
    documents: &[Document],
    id_field: &str,
    timestamp_field: &str,
) -> Result<Vec<RenderedDocument>> {
    validate_documents(documents)?;
    let now = Utc::now();
    documents
        .iter()
        .map(|document| -> Result<RenderedDocument> {
            Ok(RenderedDocument {
                id: document.id.to_string(),
                body: render_document(document, id_field, timestamp_field, now)?,
            })
        })
        .collect()
}

/// Something written in chunks that can name itself in a partial failure.
pub trait Keyed {
    fn key(&self) -> String;
}

impl Keyed for Document {
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Keyed for RenderedDocument {
    fn key(&self) -> String {
        self.id.clone()
    }
}

fn render_value(value: &FieldValue) -> Result<Value> {
    match value {
        FieldValue::Float(number) => finite_number(*number),
        FieldValue::Timestamp(ts) => Ok(Value::String(format_timestamp(*ts))),
        other => {
            serde_json::to_value(other).map_err(|e| SearchIndexError::serialization(e.to_string()))
        }
    }
}

fn finite_number(number: f64) -> Result<Value> {
    serde_json::Number::from_f64(number)
        .map(Value::Number)
        .ok_or_else(|| {
            SearchIndexError::serialization(format!("Non-finite number {} cannot be indexed", number))
        })
}

/// Timestamp format accepted by both Solr date fields and OpenSearch `date`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp returned by a backend.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| SearchIndexError::transient(format!("Invalid timestamp '{}': {}", raw, e)))
}

/// Result of one physical write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// Documents the backend wrote.
    pub committed: usize,
    /// Documents left untouched because they already existed and overwrite was off.
    pub skipped: usize,
    /// Identifiers the backend reported as failed.
    pub failed_ids: Vec<String>,
}

impl ChunkOutcome {
    /// Every document in the chunk was written.
    pub fn all_committed(count: usize) -> Self {
        Self {
            committed: count,
            ..Self::default()
        }
    }
}

/// Drive a batch write in chunks of at most `buffer_size` documents.
///
/// Chunks are written in order. A failed chunk does not stop later chunks
/// unless the failure is connection-level, in which case the remaining
/// documents are reported as failed without being sent. When nothing at all was
/// written the first underlying error is returned as is; otherwise failures
/// surface as `PartialBatchError`.
pub async fn write_in_chunks<'a, T, F, Fut>(
    documents: &'a [T],
    buffer_size: usize,
    mut write_chunk: F,
) -> Result<IndexSummary>
where
    T: Keyed,
    F: FnMut(&'a [T]) -> Fut,
    Fut: Future<Output = Result<ChunkOutcome>>,
{
    let buffer_size = buffer_size.max(1);
    let mut summary = IndexSummary {
        submitted: documents.len(),
        ..IndexSummary::default()
    };
    let mut failed_ids: Vec<String> = Vec::new();
    let mut first_error: Option<SearchIndexError> = None;

    for (position, chunk) in documents.chunks(buffer_size).enumerate() {
        match write_chunk(chunk).await {
            Ok(outcome) => {
                summary.chunks += 1;
                summary.committed += outcome.committed;
                summary.skipped += outcome.skipped;
                failed_ids.extend(outcome.failed_ids);
            }
            Err(e) => {
                warn!(
                    chunk = position,
                    chunk_size = chunk.len(),
                    error = %e,
                    "Chunk write failed"
                );
                failed_ids.extend(chunk.iter().map(Keyed::key));
                let stop = e.is_connection_failure();
                first_error.get_or_insert(e);
                if stop {
                    let sent = (position + 1) * buffer_size;
                    failed_ids.extend(documents.iter().skip(sent).map(Keyed::key));
                    break;
                }
            }
        }
    }

    if failed_ids.is_empty() {
        return Ok(summary);
    }

    if summary.committed == 0 && summary.skipped == 0 {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    Err(SearchIndexError::partial_batch(failed_ids, summary.committed))
}
