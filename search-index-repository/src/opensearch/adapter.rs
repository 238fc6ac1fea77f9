//! OpenSearch adapter implementation.
//!
//! This module provides the concrete implementation of `IndexAdapter` using
//! the OpenSearch Rust crate.

use std::sync::Arc;

use async_trait::async_trait;
use opensearch::{
    auth::Credentials as BasicAuth,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    http::request::JsonBody,
    indices::IndicesForcemergeParts,
    params::Refresh,
    BulkParts, DeleteParts, OpenSearch, SearchParts,
};
use search_index_shared::{Document, DocumentId, LastInsert, LogEntry};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use super::response::{BulkResponse, SearchResponse};
use crate::config::{ConnectionParams, IndexConfig, OpenSearchParams};
use crate::connection::ConnectionTracker;
use crate::errors::{Result, SearchIndexError};
use crate::interfaces::IndexAdapter;
use crate::types::{ConnectionState, IndexHealth, IndexOptions, IndexSummary};
use crate::utils::{self, ChunkOutcome, RenderedDocument};

const ENGINE: &str = "opensearch";

const ID_FIELD: &str = "id";

/// Field holding the write time, used by `last_insert`.
const TIMESTAMP_FIELD: &str = "indexed_at";

/// OpenSearch's default `index.refresh_interval`. Commit windows shorter than
/// this need an explicit refresh.
const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;

/// OpenSearch adapter implementation.
///
/// Writes go through `_bulk`; `overwrite = Some(false)` uses `create` actions so
/// existing documents are left untouched.
///
/// # Example
///
/// ```ignore
/// let config = Arc::new(IndexConfig::resolve(&EnvSource::new())?);
/// let adapter = OpenSearchAdapter::new(config)?;
/// adapter.delete(&DocumentId::from("42")).await?;
/// ```
pub struct OpenSearchAdapter {
    client: OpenSearch,
    params: OpenSearchParams,
    tracker: ConnectionTracker,
}

impl OpenSearchAdapter {
    /// Create a new OpenSearch adapter for the configured URL and index.
    ///
    /// # Arguments
    ///
    /// * `config` - Resolved configuration carrying OpenSearch parameters
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchAdapter)` - A new, disconnected adapter
    /// * `Err(SearchIndexError::ConfigurationError)` - If the parameters are not
    ///   for OpenSearch, the URL does not parse, or the transport cannot be built
    pub fn new(config: Arc<IndexConfig>) -> Result<Self> {
        let params = match &config.connection {
            ConnectionParams::OpenSearch(params) => params.clone(),
            other => {
                return Err(SearchIndexError::configuration(format!(
                    "OpenSearch adapter requires OpenSearch connection parameters, got {}",
                    other.engine()
                )))
            }
        };

        let parsed_url = Url::parse(&params.url)
            .map_err(|e| SearchIndexError::configuration(format!("opensearch_url: {}", e)))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(config.defaults.request_timeout);
        if let Some(credentials) = &params.credentials {
            builder = builder.auth(BasicAuth::Basic(
                credentials.username.clone(),
                credentials.password.clone().unwrap_or_default(),
            ));
        }
        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::configuration(e.to_string()))?;

        info!(
            url = %params.url,
            index = %params.index,
            "Created OpenSearch adapter"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            params,
            tracker: ConnectionTracker::new(ENGINE),
        })
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.tracker.state()
    }

    /// Bulk body for one chunk: an action line followed by the source for each
    /// document.
    fn bulk_body(chunk: &[RenderedDocument], overwrite: Option<bool>) -> Vec<JsonBody<Value>> {
        let action = match overwrite {
            Some(false) => "create",
            _ => "index",
        };
        let mut body = Vec::with_capacity(chunk.len() * 2);
        for doc in chunk {
            body.push(json!({ action: { "_id": doc.id } }).into());
            body.push(Value::Object(doc.body.clone()).into());
        }
        body
    }

    fn refresh_for(commit_within_ms: u64) -> Option<Refresh> {
        (commit_within_ms < DEFAULT_REFRESH_INTERVAL_MS).then_some(Refresh::WaitFor)
    }

    async fn write_chunk(
        &self,
        chunk: &[RenderedDocument],
        options: &IndexOptions,
    ) -> Result<ChunkOutcome> {
        let mut request = self
            .client
            .bulk(BulkParts::Index(&self.params.index))
            .body(Self::bulk_body(chunk, options.overwrite));
        if let Some(refresh) = Self::refresh_for(options.commit_within_ms) {
            request = request.refresh(refresh);
        }

        let response = request.send().await.map_err(error_for_transport);
        let response: BulkResponse = self.tracker.observe(decode(response).await)?;

        let sent_ids: Vec<String> = chunk.iter().map(|doc| doc.id.clone()).collect();
        let outcome = response.into_outcome(&sent_ids);

        debug!(
            committed = outcome.committed,
            skipped = outcome.skipped,
            failed = outcome.failed_ids.len(),
            "OpenSearch bulk chunk written"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl IndexAdapter for OpenSearchAdapter {
    fn engine(&self) -> &'static str {
        ENGINE
    }

    async fn index(&self, documents: &[Document], options: &IndexOptions) -> Result<IndexSummary> {
        let rendered = utils::render_documents(documents, ID_FIELD, TIMESTAMP_FIELD)?;
        self.tracker.ensure_usable()?;
        let _guard = self.tracker.shared().await;

        utils::write_in_chunks(&rendered, options.effective_buffer_size(), |chunk| {
            self.write_chunk(chunk, options)
        })
        .await
    }

    /// Delete a document. A missing document (404) is success.
    async fn delete(&self, id: &DocumentId) -> Result<()> {
        if !id.is_valid() {
            return Err(SearchIndexError::validation("Cannot delete an empty identifier"));
        }
        self.tracker.ensure_usable()?;
        let _guard = self.tracker.shared().await;

        let doc_id = id.to_string();
        let response = self
            .client
            .delete(DeleteParts::IndexId(&self.params.index, &doc_id))
            .send()
            .await
            .map_err(error_for_transport);
        let response = self.tracker.observe(response)?;

        let status = response.status_code().as_u16();
        if status == 404 {
            debug!(doc_id = %doc_id, "Document already absent");
            return Ok(());
        }
        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = status, body = %error_body, "Delete request failed");
            return self.tracker.observe(Err(error_for_status(status, &error_body)));
        }

        debug!(doc_id = %doc_id, "Document deleted");
        Ok(())
    }

    async fn optimize(&self) -> Result<()> {
        self.tracker.ensure_usable()?;
        let _guard = self.tracker.exclusive().await;

        info!(index = %self.params.index, "Force-merging OpenSearch index");
        let response = self
            .client
            .indices()
            .forcemerge(IndicesForcemergeParts::Index(&[self.params.index.as_str()]))
            .max_num_segments(1)
            .send()
            .await
            .map_err(error_for_transport);
        let _: Value = self.tracker.observe(decode(response).await)?;
        info!(index = %self.params.index, "OpenSearch index force-merged");
        Ok(())
    }

    async fn status(&self) -> IndexHealth {
        if self.tracker.ensure_usable().is_err() {
            return IndexHealth::down(self.tracker.state(), "adapter is faulted");
        }

        let outcome = match self.client.ping().send().await {
            Ok(response) if response.status_code().is_success() => Ok(()),
            Ok(response) => Err(error_for_status(response.status_code().as_u16(), "")),
            Err(e) => Err(error_for_transport(e)),
        };

        match self.tracker.observe(outcome) {
            Ok(()) => IndexHealth::up(self.tracker.state()),
            Err(e) => {
                warn!(error = %e, "OpenSearch status check failed");
                IndexHealth::down(self.tracker.state(), e.to_string())
            }
        }
    }

    async fn last_insert(&self) -> Result<LastInsert> {
        self.tracker.ensure_usable()?;
        let _guard = self.tracker.shared().await;

        let response = self
            .client
            .search(SearchParts::Index(&[self.params.index.as_str()]))
            .body(json!({
                "size": 1,
                "sort": [{ TIMESTAMP_FIELD: { "order": "desc", "unmapped_type": "date" } }],
                "_source": [TIMESTAMP_FIELD]
            }))
            .send()
            .await
            .map_err(error_for_transport);
        let response = self.tracker.observe(response)?;

        // Indices are created on first write.
        if response.status_code().as_u16() == 404 {
            return Ok(LastInsert::Unknown);
        }

        let response: SearchResponse = self.tracker.observe(decode(Ok(response)).await)?;
        match response.first_value(TIMESTAMP_FIELD) {
            Some(raw) => Ok(LastInsert::At(utils::parse_timestamp(raw)?)),
            None => Ok(LastInsert::Unknown),
        }
    }

    async fn get_logs(&self) -> Result<Vec<LogEntry>> {
        self.tracker.ensure_usable()?;
        Ok(Vec::new())
    }
}

/// Check the status of a response and decode its JSON body.
async fn decode<T: DeserializeOwned>(response: Result<Response>) -> Result<T> {
    let response = response?;
    let status = response.status_code().as_u16();
    if !(200..300).contains(&status) {
        let error_body = response.text().await.unwrap_or_default();
        return Err(error_for_status(status, &error_body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| SearchIndexError::transient(format!("Malformed OpenSearch response: {}", e)))
}

fn error_for_transport(e: opensearch::Error) -> SearchIndexError {
    if let Some(status) = e.status_code() {
        return error_for_status(status.as_u16(), &e.to_string());
    }
    if e.is_timeout() {
        SearchIndexError::transient(format!("OpenSearch request timed out: {}", e))
    } else {
        SearchIndexError::connection(format!("OpenSearch unreachable: {}", e))
    }
}

fn error_for_status(status: u16, body: &str) -> SearchIndexError {
    let detail: String = body.chars().take(200).collect();
    match status {
        401 | 403 | 404 => SearchIndexError::connection(format!(
            "OpenSearch refused access ({}): {}",
            status, detail
        )),
        409 | 429 => SearchIndexError::transient(format!("OpenSearch returned {}: {}", status, detail)),
        400..=499 => SearchIndexError::validation(format!(
            "OpenSearch rejected request ({}): {}",
            status, detail
        )),
        _ => SearchIndexError::transient(format!("OpenSearch returned {}: {}", status, detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, IndexDefaults};
    use serde_json::Map;

    fn opensearch_config(url: &str) -> Arc<IndexConfig> {
        Arc::new(IndexConfig::new(
            ConnectionParams::OpenSearch(OpenSearchParams {
                url: url.to_string(),
                index: "documents".to_string(),
                credentials: Some(Credentials {
                    username: "admin".to_string(),
                    password: Some("secret".to_string()),
                }),
            }),
            IndexDefaults::default(),
        ))
    }

    fn rendered(id: &str) -> RenderedDocument {
        let mut body = Map::new();
        body.insert("id".to_string(), json!(id));
        RenderedDocument {
            id: id.to_string(),
            body,
        }
    }

    #[test]
    fn test_new_starts_disconnected() {
        let adapter = OpenSearchAdapter::new(opensearch_config("http://localhost:9200")).unwrap();
        assert_eq!(adapter.connection_state(), ConnectionState::Disconnected);
        assert_eq!(adapter.engine(), "opensearch");
    }

    #[test]
    fn test_new_rejects_bad_url_and_foreign_params() {
        assert!(matches!(
            OpenSearchAdapter::new(opensearch_config("not a url")),
            Err(SearchIndexError::ConfigurationError(_))
        ));
        assert!(matches!(
            OpenSearchAdapter::new(Arc::new(IndexConfig::memory())),
            Err(SearchIndexError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_refresh_only_below_default_interval() {
        assert!(matches!(
            OpenSearchAdapter::refresh_for(0),
            Some(Refresh::WaitFor)
        ));
        assert!(matches!(
            OpenSearchAdapter::refresh_for(999),
            Some(Refresh::WaitFor)
        ));
        assert!(OpenSearchAdapter::refresh_for(1000).is_none());
        assert!(OpenSearchAdapter::refresh_for(3000).is_none());
    }

    #[test]
    fn test_bulk_body_pairs_actions_with_sources() {
        let chunk = vec![rendered("a"), rendered("b")];

        let body = OpenSearchAdapter::bulk_body(&chunk, None);
        assert_eq!(body.len(), 4);

        let body = OpenSearchAdapter::bulk_body(&chunk, Some(false));
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn test_error_for_status() {
        assert!(matches!(
            error_for_status(401, ""),
            SearchIndexError::ConnectionError(_)
        ));
        assert!(matches!(
            error_for_status(429, ""),
            SearchIndexError::TransientRequestError(_)
        ));
        assert!(matches!(
            error_for_status(400, "mapper_parsing_exception"),
            SearchIndexError::ValidationError(_)
        ));
        assert!(matches!(
            error_for_status(503, ""),
            SearchIndexError::TransientRequestError(_)
        ));
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let adapter = OpenSearchAdapter::new(opensearch_config("http://localhost:9200")).unwrap();

        let err = adapter
            .index(&[Document::new("ok"), Document::new("")], &IndexOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchIndexError::ValidationError(_)));

        let err = adapter.delete(&DocumentId::from("")).await.unwrap_err();
        assert!(matches!(err, SearchIndexError::ValidationError(_)));

        assert_eq!(adapter.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_get_logs_is_empty() {
        let adapter = OpenSearchAdapter::new(opensearch_config("http://localhost:9200")).unwrap();
        assert!(adapter.get_logs().await.unwrap().is_empty());
        assert!(adapter.get_logs().await.unwrap().is_empty());
    }
}
