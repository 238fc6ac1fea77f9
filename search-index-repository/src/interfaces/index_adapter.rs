//! Index adapter trait definition.
//!
//! This module defines the uniform contract translated by each adapter into its
//! backend's protocol (Solr, OpenSearch, in-memory).

use async_trait::async_trait;
use search_index_shared::{Document, DocumentId, LastInsert, LogEntry};

use crate::errors::SearchIndexError;
use crate::types::{IndexHealth, IndexOptions, IndexSummary};

/// Abstracts the underlying search engine.
///
/// Every registered engine implements all seven operations; the facade never
/// probes for capabilities. Implementations must be safe to share between
/// concurrent callers and must reject malformed documents before issuing any
/// network request.
///
/// All fallible methods return `Result<T, SearchIndexError>` so that errors mean
/// the same thing regardless of the backend.
#[async_trait]
pub trait IndexAdapter: Send + Sync {
    /// Backend identifier, e.g. `"solr"`.
    fn engine(&self) -> &'static str;

    /// Submit documents for indexing.
    ///
    /// Documents are written in order, in physical chunks of at most
    /// `options.buffer_size`, and must become visible to queries within
    /// `options.commit_within_ms`.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexSummary)` - If every document was committed or deliberately skipped
    /// * `Err(SearchIndexError::ValidationError)` - If a document has no usable identifier
    /// * `Err(SearchIndexError::PartialBatchError)` - If some documents failed after
    ///   others were committed
    /// * `Err(SearchIndexError)` - If nothing was committed
    async fn index(
        &self,
        documents: &[Document],
        options: &IndexOptions,
    ) -> Result<IndexSummary, SearchIndexError>;

    /// Replace documents, creating them when missing.
    ///
    /// Identical to [`IndexAdapter::index`] with `overwrite` forced on.
    async fn update_index(
        &self,
        documents: &[Document],
        commit_within_ms: u64,
    ) -> Result<IndexSummary, SearchIndexError> {
        self.index(documents, &IndexOptions::for_update(commit_within_ms))
            .await
    }

    /// Delete a document from the index.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    async fn delete(&self, id: &DocumentId) -> Result<(), SearchIndexError>;

    /// Defragment or compact the index.
    ///
    /// Potentially long-running. Other operations on the same adapter wait
    /// while it runs.
    async fn optimize(&self) -> Result<(), SearchIndexError>;

    /// Check whether the backend is reachable and accepting requests.
    ///
    /// A down backend is reported as `reachable = false`, never as an error.
    async fn status(&self) -> IndexHealth;

    /// Timestamp of the most recently committed document.
    ///
    /// Returns `LastInsert::Unknown` when the backend cannot report it.
    async fn last_insert(&self) -> Result<LastInsert, SearchIndexError>;

    /// Query-log entries currently held by the backend.
    ///
    /// Returns an empty list when the backend keeps no query log.
    async fn get_logs(&self) -> Result<Vec<LogEntry>, SearchIndexError>;
}
