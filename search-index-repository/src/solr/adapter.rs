//! Solr adapter implementation.
//!
//! Wire protocol, relative to the core URL `http://{host}:{port}{path}/{core}`:
//!
//! | Operation | Request |
//! |---|---|
//! | index | `POST /update?commitWithin={ms}&wt=json` with a JSON array of documents |
//! | index, `overwrite = false` | first `POST /get` with form body `ids={escaped,ids}&fl=id` |
//! | delete | `POST /update?commitWithin={ms}&wt=json` with `{"delete": {"id": ...}}` |
//! | optimize | `POST /update?wt=json` with `{"optimize": {"waitSearcher": false}}` |
//! | status | `GET /admin/ping?wt=json`, healthy when `status == "OK"` |
//! | last_insert | `GET /select?q=*:*&sort=timestamp desc&rows=1&fl=timestamp` |
//! | get_logs | `GET {path}/admin/info/logging?since=0&wt=json` |
//!
//! Error mapping: transport connect failures and HTTP 401/403/404 are connection
//! errors and fault the adapter; timeouts, HTTP 409/429/5xx and unreadable bodies
//! are transient; other HTTP 4xx responses mean Solr rejected the documents and
//! are validation errors.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use search_index_shared::{Document, DocumentId, LastInsert, LogEntry};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::response::{LoggingResponse, PingResponse, SelectResponse, UpdateResponse};
use crate::config::{ConnectionParams, IndexConfig, SolrParams};
use crate::connection::ConnectionTracker;
use crate::errors::{Result, SearchIndexError};
use crate::interfaces::IndexAdapter;
use crate::types::{ConnectionState, IndexHealth, IndexOptions, IndexSummary};
use crate::utils::{self, ChunkOutcome, RenderedDocument};

const ENGINE: &str = "solr";

/// Field holding the document identifier (Solr's default `uniqueKey`).
const ID_FIELD: &str = "id";

/// Field holding the write time, used by `last_insert`.
const TIMESTAMP_FIELD: &str = "timestamp";

/// Solr adapter.
///
/// Connectionless per request: each operation is an independent HTTP call, so
/// concurrent callers only share the `reqwest` connection pool.
///
/// # Example
///
/// ```ignore
/// let config = Arc::new(IndexConfig::resolve(&EnvSource::new())?);
/// let adapter = SolrAdapter::new(config)?;
/// adapter.index(&[Document::new("42").with_field("title", "hello")], &IndexOptions::default()).await?;
/// ```
pub struct SolrAdapter {
    client: Client,
    params: SolrParams,
    config: Arc<IndexConfig>,
    tracker: ConnectionTracker,
}

impl SolrAdapter {
    /// Create a Solr adapter. No request is sent until the first operation.
    ///
    /// # Returns
    ///
    /// * `Ok(SolrAdapter)` - A new, disconnected adapter
    /// * `Err(SearchIndexError::ConfigurationError)` - If the configuration is not
    ///   for Solr or the HTTP client cannot be built
    pub fn new(config: Arc<IndexConfig>) -> Result<Self> {
        let params = match &config.connection {
            ConnectionParams::Solr(params) => params.clone(),
            other => {
                return Err(SearchIndexError::configuration(format!(
                    "Solr adapter requires Solr connection parameters, got {}",
                    other.engine()
                )))
            }
        };

        let client = Client::builder()
            .timeout(config.defaults.request_timeout)
            .build()
            .map_err(|e| SearchIndexError::configuration(e.to_string()))?;

        info!(
            url = %params.core_url(),
            request_timeout_ms = config.defaults.request_timeout.as_millis() as u64,
            "Created Solr adapter"
        );

        Ok(Self {
            client,
            params,
            config,
            tracker: ConnectionTracker::new(ENGINE),
        })
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.tracker.state()
    }

    fn core_endpoint(&self, handler: &str) -> String {
        format!("{}/{}", self.params.core_url(), handler)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.params.credentials {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, credentials.password.as_deref())
            }
            None => builder,
        }
    }

    /// Send a request and decode the JSON body, mapping failures to the error
    /// taxonomy. Does not touch the connection state.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let (status, body) = self.send_raw(builder).await?;
        if !status.is_success() {
            return Err(error_for_status(status, &body));
        }
        decode(&body)
    }

    async fn send_raw(&self, builder: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = builder.send().await.map_err(error_for_transport)?;
        let status = response.status();
        let body = response.text().await.map_err(error_for_transport)?;
        Ok((status, body))
    }

    /// POST an update command and check Solr's response header.
    async fn post_update(&self, body: &Value, query: &[(&str, String)]) -> Result<()> {
        let builder = self
            .request(Method::POST, &self.core_endpoint("update"))
            .query(query)
            .query(&[("wt", "json")])
            .json(body);

        let response: UpdateResponse = self.send(builder).await?;
        if response.response_header.status != 0 {
            let msg = response
                .error
                .and_then(|e| e.msg)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(SearchIndexError::transient(format!(
                "Solr update returned status {}: {}",
                response.response_header.status, msg
            )));
        }
        Ok(())
    }

    /// Identifiers among `ids` that already exist, via real-time get.
    ///
    /// Sent as a form body: a full chunk of identifiers does not fit in a URL.
    async fn existing_ids(&self, ids: &[&str]) -> Result<HashSet<String>> {
        let ids = ids
            .iter()
            .map(|id| escape_id(id))
            .collect::<Vec<_>>()
            .join(",");
        let builder = self
            .request(Method::POST, &self.core_endpoint("get"))
            .form(&[("ids", ids.as_str()), ("fl", ID_FIELD), ("wt", "json")]);
        let response: SelectResponse = self.send(builder).await?;
        Ok(response.field_values(ID_FIELD).into_iter().collect())
    }

    /// Write one chunk. With `overwrite = Some(false)` documents that already
    /// exist are skipped instead of replaced, and so are repeats of an
    /// identifier within the chunk after its first occurrence.
    async fn write_chunk(
        &self,
        chunk: &[RenderedDocument],
        options: &IndexOptions,
    ) -> Result<ChunkOutcome> {
        let pending: Vec<&RenderedDocument> = if options.overwrite == Some(false) {
            let mut seen = HashSet::new();
            let first_seen: Vec<&RenderedDocument> = chunk
                .iter()
                .filter(|&doc| seen.insert(doc.id.as_str()))
                .collect();
            let ids: Vec<&str> = first_seen.iter().map(|doc| doc.id.as_str()).collect();
            let existing = self.tracker.observe(self.existing_ids(&ids).await)?;
            first_seen
                .into_iter()
                .filter(|doc| !existing.contains(&doc.id))
                .collect()
        } else {
            chunk.iter().collect()
        };
        let skipped = chunk.len() - pending.len();

        if pending.is_empty() {
            return Ok(ChunkOutcome {
                skipped,
                ..ChunkOutcome::default()
            });
        }

        let body = Value::Array(
            pending
                .iter()
                .map(|doc| Value::Object(doc.body.clone()))
                .collect(),
        );
        let query = [("commitWithin", options.commit_within_ms.to_string())];
        self.tracker.observe(self.post_update(&body, &query).await)?;

        debug!(
            committed = pending.len(),
            skipped = skipped,
            commit_within_ms = options.commit_within_ms,
            "Solr chunk written"
        );

        Ok(ChunkOutcome {
            committed: pending.len(),
            skipped,
            failed_ids: Vec::new(),
        })
    }
}

#[async_trait]
impl IndexAdapter for SolrAdapter {
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

    async fn delete(&self, id: &DocumentId) -> Result<()> {
        if !id.is_valid() {
            return Err(SearchIndexError::validation("Cannot delete an empty identifier"));
        }
        self.tracker.ensure_usable()?;
        let _guard = self.tracker.shared().await;

        let body = json!({ "delete": { "id": id.to_string() } });
        let query = [(
            "commitWithin",
            self.config.defaults.commit_within_ms.to_string(),
        )];
        self.tracker.observe(self.post_update(&body, &query).await)?;

        debug!(id = %id, "Solr document deleted");
        Ok(())
    }

    async fn optimize(&self) -> Result<()> {
        self.tracker.ensure_usable()?;
        let _guard = self.tracker.exclusive().await;

        info!(core = %self.params.core, "Optimizing Solr core");
        let body = json!({ "optimize": { "waitSearcher": false } });
        self.tracker.observe(self.post_update(&body, &[]).await)?;
        info!(core = %self.params.core, "Solr core optimized");
        Ok(())
    }

    async fn status(&self) -> IndexHealth {
        if self.tracker.ensure_usable().is_err() {
            return IndexHealth::down(self.tracker.state(), "adapter is faulted");
        }

        let builder = self
            .request(Method::GET, &self.core_endpoint("admin/ping"))
            .query(&[("wt", "json")]);

        let outcome = match self.send::<PingResponse>(builder).await {
            Ok(ping) if ping.status.as_deref() == Some("OK") => Ok(()),
            Ok(ping) => Err(SearchIndexError::transient(format!(
                "Solr ping returned status {:?}",
                ping.status
            ))),
            Err(e) => Err(e),
        };

        match self.tracker.observe(outcome) {
            Ok(()) => IndexHealth::up(self.tracker.state()),
            Err(e) => {
                warn!(error = %e, "Solr status check failed");
                IndexHealth::down(self.tracker.state(), e.to_string())
            }
        }
    }

    async fn last_insert(&self) -> Result<LastInsert> {
        self.tracker.ensure_usable()?;
        let _guard = self.tracker.shared().await;

        let builder = self
            .request(Method::GET, &self.core_endpoint("select"))
            .query(&[
                ("q", "*:*".to_string()),
                ("sort", format!("{} desc", TIMESTAMP_FIELD)),
                ("rows", "1".to_string()),
                ("fl", TIMESTAMP_FIELD.to_string()),
                ("wt", "json".to_string()),
            ]);

        let response = match self.tracker.observe(self.send::<SelectResponse>(builder).await) {
            Ok(response) => response,
            Err(SearchIndexError::ValidationError(reason)) => {
                warn!(reason = %reason, "Solr core cannot sort by timestamp");
                return Ok(LastInsert::Unknown);
            }
            Err(e) => return Err(e),
        };

        if response.response.num_found == 0 {
            return Ok(LastInsert::Unknown);
        }
        match response.field_values(TIMESTAMP_FIELD).first() {
            Some(raw) => Ok(LastInsert::At(utils::parse_timestamp(raw)?)),
            None => Ok(LastInsert::Unknown),
        }
    }

    async fn get_logs(&self) -> Result<Vec<LogEntry>> {
        self.tracker.ensure_usable()?;
        let _guard = self.tracker.shared().await;

        let url = format!("{}/admin/info/logging", self.params.base_url());
        let builder = self
            .request(Method::GET, &url)
            .query(&[("since", "0"), ("wt", "json")]);

        let (status, body) = self.tracker.observe(self.send_raw(builder).await)?;
        if status == StatusCode::NOT_FOUND {
            debug!("Solr logging handler unavailable");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return self.tracker.observe(Err(error_for_status(status, &body)));
        }

        let response: LoggingResponse = decode(&body)?;
        Ok(response.into_entries())
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| SearchIndexError::transient(format!("Malformed Solr response: {}", e)))
}

/// Escape an identifier for Solr's comma-separated `ids` parameter.
fn escape_id(id: &str) -> String {
    id.replace('\\', "\\\\").replace(',', "\\,")
}

fn error_for_transport(e: reqwest::Error) -> SearchIndexError {
    if e.is_timeout() {
        SearchIndexError::transient(format!("Solr request timed out: {}", e))
    } else if e.is_connect() {
        SearchIndexError::connection(format!("Solr unreachable: {}", e))
    } else {
        SearchIndexError::transient(format!("Solr request failed: {}", e))
    }
}

fn error_for_status(status: StatusCode, body: &str) -> SearchIndexError {
    let detail = serde_json::from_str::<UpdateResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .and_then(|e| e.msg)
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SearchIndexError::connection(format!(
            "Solr rejected credentials ({}): {}",
            status, detail
        )),
        StatusCode::NOT_FOUND => {
            SearchIndexError::connection(format!("Solr endpoint not found ({}): {}", status, detail))
        }
        StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS => {
            SearchIndexError::transient(format!("Solr returned {}: {}", status, detail))
        }
        s if s.is_client_error() => {
            SearchIndexError::validation(format!("Solr rejected request ({}): {}", status, detail))
        }
        _ => SearchIndexError::transient(format!("Solr returned {}: {}", status, detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexDefaults;

    fn solr_config() -> Arc<IndexConfig> {
        Arc::new(IndexConfig::new(
            ConnectionParams::Solr(SolrParams {
                host: "localhost".to_string(),
                port: 8983,
                core: "hub".to_string(),
                path: "/solr".to_string(),
                credentials: None,
            }),
            IndexDefaults::default(),
        ))
    }

    #[test]
    fn test_new_starts_disconnected() {
        let adapter = SolrAdapter::new(solr_config()).unwrap();
        assert_eq!(
            adapter.connection_state(),
            ConnectionState::Disconnected
        );
        assert_eq!(
            adapter.core_endpoint("update"),
            "http://localhost:8983/solr/hub/update"
        );
    }

    #[test]
    fn test_new_rejects_foreign_params() {
        let config = Arc::new(IndexConfig::memory());
        assert!(matches!(
            SolrAdapter::new(config),
            Err(SearchIndexError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_error_for_status() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, ""),
            SearchIndexError::ConnectionError(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            SearchIndexError::TransientRequestError(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, ""),
            SearchIndexError::TransientRequestError(_)
        ));

        let body = r#"{"responseHeader":{"status":400,"QTime":0},"error":{"msg":"unknown field 'colour'","code":400}}"#;
        assert_eq!(
            error_for_status(StatusCode::BAD_REQUEST, body),
            SearchIndexError::validation("Solr rejected request (400 Bad Request): unknown field 'colour'")
        );
    }

    #[test]
    fn test_escape_id() {
        assert_eq!(escape_id("plain"), "plain");
        assert_eq!(escape_id("a,b"), "a\\,b");
        assert_eq!(escape_id("c:\\tmp,x"), "c:\\\\tmp\\,x");
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let adapter = SolrAdapter::new(solr_config()).unwrap();

        let err = adapter
            .index(&[Document::new("")], &IndexOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchIndexError::ValidationError(_)));

        let err = adapter.delete(&DocumentId::from(" ")).await.unwrap_err();
        assert!(matches!(err, SearchIndexError::ValidationError(_)));

        assert_eq!(
            adapter.connection_state(),
            ConnectionState::Disconnected
        );
    }
}
