//! In-process index for tests and local development.
//!
//! The `MemoryAdapter` keeps documents in a map keyed by identifier and honors
//! the same write semantics as the network adapters, so code written against
//! it behaves the same once pointed at a real engine.
//!
//! # Example
//!
//! ```
//! # #[tokio::main]
//! # async fn main() {
//! use search_index_repository::{IndexAdapter, IndexOptions, MemoryAdapter};
//! use search_index_shared::Document;
//!
//! let adapter = MemoryAdapter::new();
//! adapter
//!     .index(&[Document::new("42").with_field("title", "hello world")], &IndexOptions::default())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(adapter.search("hello").len(), 1);
//! assert_eq!(adapter.get_logs().await.unwrap().len(), 1);
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use search_index_shared::{Document, DocumentId, LastInsert, LogEntry};
use tracing::debug;

use crate::connection::ConnectionTracker;
use crate::errors::{Result, SearchIndexError};
use crate::interfaces::IndexAdapter;
use crate::types::{IndexHealth, IndexOptions, IndexSummary};
use crate::utils::{self, ChunkOutcome};

const ENGINE: &str = "memory";

/// Memory-backed index adapter.
pub struct MemoryAdapter {
    /// Map of identifier -> stored document
    documents: RwLock<HashMap<String, Document>>,
    logs: RwLock<Vec<LogEntry>>,
    tracker: ConnectionTracker,
}

impl MemoryAdapter {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            logs: RwLock::new(Vec::new()),
            tracker: ConnectionTracker::connectionless(ENGINE),
        }
    }

    /// Stored document for `id`, if any.
    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id.to_string())
            .cloned()
    }

    /// Get the number of stored documents.
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive substring search over text fields.
    ///
    /// Every call is recorded in the query log returned by `get_logs`. Hits are
    /// ordered by identifier.
    pub fn search(&self, query: &str) -> Vec<Document> {
        let needle = query.to_lowercase();
        let mut hits: Vec<Document> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|doc| {
                doc.fields
                    .values()
                    .filter_map(|value| value.as_text())
                    .any(|text| text.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));

        let mut entry = LogEntry::new(Utc::now(), query);
        entry.level = Some("INFO".to_string());
        entry.message = Some(format!("q={} hits={}", query, hits.len()));
        self.logs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);

        hits
    }

    fn write_chunk(&self, chunk: &[Document], options: &IndexOptions) -> ChunkOutcome {
        let now = Utc::now();
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut outcome = ChunkOutcome::default();
        for doc in chunk {
            let key = doc.id.to_string();
            if options.overwrite == Some(false) && documents.contains_key(&key) {
                outcome.skipped += 1;
                continue;
            }
            let mut stored = doc.clone();
            stored.indexed_at.get_or_insert(now);
            documents.insert(key, stored);
            outcome.committed += 1;
        }
        outcome
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexAdapter for MemoryAdapter {
    fn engine(&self) -> &'static str {
        ENGINE
    }

    async fn index(&self, documents: &[Document], options: &IndexOptions) -> Result<IndexSummary> {
        utils::validate_documents(documents)?;
        let _guard = self.tracker.shared().await;

        let summary = utils::write_in_chunks(documents, options.effective_buffer_size(), |chunk| {
            let outcome = self.write_chunk(chunk, options);
            async move { Ok(outcome) }
        })
        .await?;

        debug!(
            committed = summary.committed,
            skipped = summary.skipped,
            total = self.len(),
            "Memory index written"
        );
        Ok(summary)
    }

    async fn delete(&self, id: &DocumentId) -> Result<()> {
        if !id.is_valid() {
            return Err(SearchIndexError::validation("Cannot delete an empty identifier"));
        }
        let _guard = self.tracker.shared().await;

        let removed = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.to_string())
            .is_some();
        debug!(id = %id, removed = removed, "Memory document deleted");
        Ok(())
    }

    async fn optimize(&self) -> Result<()> {
        let _guard = self.tracker.exclusive().await;
        debug!(documents = self.len(), "Memory index has nothing to optimize");
        Ok(())
    }

    async fn status(&self) -> IndexHealth {
        IndexHealth::up(self.tracker.state())
    }

    async fn last_insert(&self) -> Result<LastInsert> {
        let _guard = self.tracker.shared().await;
        let latest = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter_map(|doc| doc.indexed_at)
            .max();
        Ok(LastInsert::from(latest))
    }

    async fn get_logs(&self) -> Result<Vec<LogEntry>> {
        let _guard = self.tracker.shared().await;
        Ok(self
            .logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
