//! Search index facade.
//!
//! This module provides the main entry point for indexing documents. Callers
//! pick an engine by configuration and use the same API regardless of which
//! backend ends up serving the calls.
//!
//! # Note on Validation
//!
//! The facade adds no validation, retry or caching of its own. Adapters reject
//! malformed documents before touching the network, and every error an adapter
//! returns is passed through untouched.

use std::sync::Arc;

use search_index_shared::{Document, DocumentId, LastInsert, LogEntry};
use tracing::{info, instrument};

use crate::config::{ConfigSource, IndexConfig};
use crate::errors::SearchIndexError;
use crate::interfaces::IndexAdapter;
use crate::registry;
use crate::types::{IndexHealth, IndexOptions, IndexSummary};

/// The main facade for interacting with a search index.
///
/// Holds exactly one adapter, chosen from the configured engine when the facade
/// is built, and forwards every operation to it.
///
/// # Example
///
/// ```no_run
/// use search_index_repository::{EnvSource, IndexOptions, SearchIndex};
/// use search_index_shared::Document;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let index = SearchIndex::from_source(&EnvSource::new())?;
///
/// let document = Document::new("42").with_field("title", "Hello world");
/// index.index(document, &IndexOptions::default()).await?;
///
/// if !index.status().await.reachable {
///     eprintln!("{} is down", index.engine());
/// }
/// # Ok(())
/// # }
/// ```
pub struct SearchIndex {
    adapter: Box<dyn IndexAdapter>,
    config: Arc<IndexConfig>,
}

impl SearchIndex {
    /// Build a facade for the configured engine.
    ///
    /// No network call is made; the adapter connects on first use.
    ///
    /// # Arguments
    ///
    /// * `config` - A configuration whose `engine` selects the adapter
    ///
    /// # Returns
    ///
    /// * `Ok(SearchIndex)` - A facade bound to a fresh adapter
    /// * `Err(SearchIndexError::ConfigurationError)` - If the configuration is
    ///   inconsistent or the adapter cannot be constructed
    pub fn new(config: IndexConfig) -> Result<Self, SearchIndexError> {
        config.validate()?;
        let config = Arc::new(config);
        let adapter = registry::factory_for(config.engine)(Arc::clone(&config))?;

        info!(
            engine = adapter.engine(),
            target = %config.connection.target(),
            "Search index ready"
        );

        Ok(Self { adapter, config })
    }

    /// Resolve the configuration from `source` and build the facade.
    ///
    /// # Arguments
    ///
    /// * `source` - Key-value configuration, e.g. [`crate::EnvSource`]
    ///
    /// # Returns
    ///
    /// * `Ok(SearchIndex)` - A facade bound to a fresh adapter
    /// * `Err(SearchIndexError::ConfigurationError)` - If the engine is unknown or
    ///   a parameter is missing or malformed
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, SearchIndexError> {
        Self::new(IndexConfig::resolve(source)?)
    }

    /// Build a facade around an already constructed adapter.
    ///
    /// Use this to plug in an engine the registry does not know about, or a
    /// test double.
    pub fn with_adapter(config: IndexConfig, adapter: Box<dyn IndexAdapter>) -> Self {
        Self {
            adapter,
            config: Arc::new(config),
        }
    }

    /// Name of the engine serving this facade.
    pub fn engine(&self) -> &'static str {
        self.adapter.engine()
    }

    /// The configuration the facade was built with.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Options built from the configured defaults.
    pub fn default_options(&self) -> IndexOptions {
        IndexOptions::from_defaults(&self.config.defaults)
    }

    /// Index a single document.
    #[instrument(skip_all, fields(engine = self.engine(), id = %document.id))]
    pub async fn index(
        &self,
        document: Document,
        options: &IndexOptions,
    ) -> Result<IndexSummary, SearchIndexError> {
        self.adapter.index(std::slice::from_ref(&document), options).await
    }

    /// Index a batch of documents.
    ///
    /// # Arguments
    ///
    /// * `documents` - Documents to write, in order
    /// * `options` - Overwrite mode, commit window and chunk size
    ///
    /// # Returns
    ///
    /// * `Ok(IndexSummary)` - Every document was committed or skipped
    /// * `Err(SearchIndexError::ValidationError)` - If any document lacks an
    ///   identifier; nothing was sent
    /// * `Err(SearchIndexError::PartialBatchError)` - If some documents were
    ///   committed and others failed
    /// * `Err(SearchIndexError)` - If the write failed as a whole
    #[instrument(skip_all, fields(engine = self.engine(), count = documents.len()))]
    pub async fn index_batch(
        &self,
        documents: &[Document],
        options: &IndexOptions,
    ) -> Result<IndexSummary, SearchIndexError> {
        self.adapter.index(documents, options).await
    }

    /// Index a batch using the configured commit window and buffer size.
    pub async fn index_with_defaults(
        &self,
        documents: &[Document],
    ) -> Result<IndexSummary, SearchIndexError> {
        self.index_batch(documents, &self.default_options()).await
    }

    /// Replace a single document.
    #[instrument(skip_all, fields(engine = self.engine(), id = %document.id))]
    pub async fn update_index(
        &self,
        document: Document,
        commit_within_ms: u64,
    ) -> Result<IndexSummary, SearchIndexError> {
        self.adapter
            .update_index(std::slice::from_ref(&document), commit_within_ms)
            .await
    }

    /// Replace a batch of documents. Same as `index_batch` with overwrite on.
    #[instrument(skip_all, fields(engine = self.engine(), count = documents.len()))]
    pub async fn update_index_batch(
        &self,
        documents: &[Document],
        commit_within_ms: u64,
    ) -> Result<IndexSummary, SearchIndexError> {
        self.adapter.update_index(documents, commit_within_ms).await
    }

    /// Delete a document. Deleting an identifier that is not indexed succeeds.
    #[instrument(skip_all, fields(engine = self.engine(), id = %id))]
    pub async fn delete(&self, id: &DocumentId) -> Result<(), SearchIndexError> {
        self.adapter.delete(id).await
    }

    /// Defragment the backend index. Other operations wait until it finishes.
    #[instrument(skip_all, fields(engine = self.engine()))]
    pub async fn optimize(&self) -> Result<(), SearchIndexError> {
        self.adapter.optimize().await
    }

    /// Health of the backend. Never fails; an unreachable backend reports
    /// `reachable = false`.
    #[instrument(skip_all, fields(engine = self.engine()))]
    pub async fn status(&self) -> IndexHealth {
        self.adapter.status().await
    }

    #[instrument(skip_all, fields(engine = self.engine()))]
    pub async fn last_insert(&self) -> Result<LastInsert, SearchIndexError> {
        self.adapter.last_insert().await
    }

    /// Query log as reported by the backend at call time.
    #[instrument(skip_all, fields(engine = self.engine()))]
    pub async fn get_logs(&self) -> Result<Vec<LogEntry>, SearchIndexError> {
        self.adapter.get_logs().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionState;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock adapter for testing
    #[derive(Default)]
    struct MockAdapter {
        indexed: Arc<Mutex<Vec<(Vec<Document>, IndexOptions)>>>,
        deleted: Arc<Mutex<Vec<DocumentId>>>,
        optimize_calls: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait]
    impl IndexAdapter for MockAdapter {
        fn engine(&self) -> &'static str {
            "mock"
        }

        async fn index(
            &self,
            documents: &[Document],
            options: &IndexOptions,
        ) -> Result<IndexSummary, SearchIndexError> {
            if self.should_fail {
                return Err(SearchIndexError::partial_batch(vec!["b".to_string()], 1));
            }
            self.indexed
                .lock()
                .unwrap()
                .push((documents.to_vec(), *options));
            Ok(IndexSummary {
                submitted: documents.len(),
                committed: documents.len(),
                skipped: 0,
                chunks: 1,
            })
        }

        async fn delete(&self, id: &DocumentId) -> Result<(), SearchIndexError> {
            if self.should_fail {
                return Err(SearchIndexError::connection("Mock failure"));
            }
            self.deleted.lock().unwrap().push(id.clone());
            Ok(())
        }

        async fn optimize(&self) -> Result<(), SearchIndexError> {
            self.optimize_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn status(&self) -> IndexHealth {
            if self.should_fail {
                IndexHealth::down(ConnectionState::Faulted, "Mock failure")
            } else {
                IndexHealth::up(ConnectionState::Connected)
            }
        }

        async fn last_insert(&self) -> Result<LastInsert, SearchIndexError> {
            Ok(LastInsert::Unknown)
        }

        async fn get_logs(&self) -> Result<Vec<LogEntry>, SearchIndexError> {
            Ok(vec![])
        }
    }

    fn facade(adapter: MockAdapter) -> SearchIndex {
        SearchIndex::with_adapter(IndexConfig::memory(), Box::new(adapter))
    }

    #[tokio::test]
    async fn test_index_forwards_options() {
        let adapter = MockAdapter::default();
        let indexed = Arc::clone(&adapter.indexed);
        let index = facade(adapter);

        let options = IndexOptions::default()
            .with_overwrite(false)
            .with_commit_within_ms(500);
        let summary = index
            .index(Document::new("a").with_field("title", "x"), &options)
            .await
            .unwrap();

        assert_eq!(summary.committed, 1);
        let calls = indexed.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0[0].id, DocumentId::from("a"));
        assert_eq!(calls[0].1, options);
    }

    #[tokio::test]
    async fn test_update_index_forces_overwrite() {
        let adapter = MockAdapter::default();
        let indexed = Arc::clone(&adapter.indexed);
        let index = facade(adapter);

        index
            .update_index_batch(&[Document::new("a"), Document::new("b")], 250)
            .await
            .unwrap();

        let calls = indexed.lock().unwrap();
        assert_eq!(calls[0].0.len(), 2);
        assert_eq!(calls[0].1.overwrite, Some(true));
        assert_eq!(calls[0].1.commit_within_ms, 250);
    }

    #[tokio::test]
    async fn test_index_with_defaults_uses_config() {
        let adapter = MockAdapter::default();
        let indexed = Arc::clone(&adapter.indexed);
        let index = facade(adapter);

        index.index_with_defaults(&[Document::new("a")]).await.unwrap();

        let calls = indexed.lock().unwrap();
        assert_eq!(calls[0].1, IndexOptions::default());
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let index = facade(MockAdapter {
            should_fail: true,
            ..MockAdapter::default()
        });

        let err = index
            .index_batch(&[Document::new("a"), Document::new("b")], &IndexOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SearchIndexError::partial_batch(vec!["b".to_string()], 1)
        );

        let err = index.delete(&DocumentId::from("a")).await.unwrap_err();
        assert!(matches!(err, SearchIndexError::ConnectionError(_)));

        let health = index.status().await;
        assert!(!health.reachable);
        assert_eq!(health.state, ConnectionState::Faulted);
    }

    #[tokio::test]
    async fn test_delete_and_optimize_forward() {
        let adapter = MockAdapter::default();
        let deleted = Arc::clone(&adapter.deleted);
        let optimize_calls = Arc::clone(&adapter.optimize_calls);
        let index = facade(adapter);

        index.delete(&DocumentId::from(7)).await.unwrap();
        index.optimize().await.unwrap();

        assert_eq!(*deleted.lock().unwrap(), vec![DocumentId::Integer(7)]);
        assert_eq!(optimize_calls.load(Ordering::SeqCst), 1);
        assert_eq!(index.engine(), "mock");
    }

    #[test]
    fn test_unknown_engine_is_configuration_error() {
        let source = HashMap::from([("engine".to_string(), "unknown-engine".to_string())]);
        let err = SearchIndex::from_source(&source).err().unwrap();
        assert!(matches!(err, SearchIndexError::ConfigurationError(_)));
    }

    #[test]
    fn test_new_builds_registered_engine() {
        let index = SearchIndex::new(IndexConfig::memory()).unwrap();
        assert_eq!(index.engine(), "memory");
        assert_eq!(index.config().defaults.buffer_size, 1500);
    }
}
