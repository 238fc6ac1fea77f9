//! Configuration types for the search index facade.
//!
//! An [`IndexConfig`] names the backend engine, carries the engine-specific
//! connection parameters and the operational defaults. It is resolved once from
//! a [`ConfigSource`] and is immutable afterwards.

mod source;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;
use url::Url;

use crate::errors::{Result, SearchIndexError};

pub use source::{ConfigSource, EnvSource, DEFAULT_ENV_PREFIX};

/// Default commit window in milliseconds.
pub const DEFAULT_COMMIT_WITHIN_MS: u64 = 3000;

/// Default maximum number of documents per physical write.
pub const DEFAULT_BUFFER_SIZE: usize = 1500;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default Solr port.
pub const DEFAULT_SOLR_PORT: u16 = 8983;

/// Default Solr context path.
pub const DEFAULT_SOLR_PATH: &str = "/solr";

/// Configuration keys understood by [`IndexConfig::resolve`].
pub mod keys {
    pub const ENGINE: &str = "engine";
    pub const SOLR_HOST: &str = "solr_host";
    pub const SOLR_PORT: &str = "solr_port";
    pub const SOLR_CORE: &str = "solr_core";
    pub const SOLR_PATH: &str = "solr_path";
    pub const SOLR_USERNAME: &str = "solr_username";
    pub const SOLR_PASSWORD: &str = "solr_password";
    pub const OPENSEARCH_URL: &str = "opensearch_url";
    pub const OPENSEARCH_INDEX: &str = "opensearch_index";
    pub const OPENSEARCH_USERNAME: &str = "opensearch_username";
    pub const OPENSEARCH_PASSWORD: &str = "opensearch_password";
    pub const COMMIT_WITHIN: &str = "commit_within";
    pub const BUFFER_SIZE: &str = "buffer_size";
    pub const REQUEST_TIMEOUT_SECS: &str = "request_timeout_secs";
}

/// Supported backend engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Solr,
    OpenSearch,
    /// In-process store for tests and local development.
    Memory,
}

impl EngineKind {
    /// Every registered engine, in the order they are listed to users.
    pub const ALL: [EngineKind; 3] = [Self::Solr, Self::OpenSearch, Self::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solr => "solr",
            Self::OpenSearch => "opensearch",
            Self::Memory => "memory",
        }
    }

    /// Comma-separated list of supported engine names.
    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(EngineKind::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = SearchIndexError;

    fn from_str(name: &str) -> Result<Self> {
        let normalized = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                SearchIndexError::configuration(format!(
                    "Unknown search engine '{}'; supported engines: {}",
                    name,
                    Self::supported_names()
                ))
            })
    }
}

/// Username/password pair for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Connection parameters for a Solr core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolrParams {
    pub host: String,
    pub port: u16,
    pub core: String,
    /// Context path, always starting with `/` and without a trailing slash.
    pub path: String,
    pub credentials: Option<Credentials>,
}

impl SolrParams {
    /// Base URL of the Solr web application, e.g. `http://localhost:8983/solr`.
    pub fn base_url(&self) -> String {
        let host = if self.host.contains("://") {
            self.host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.host)
        };
        format!("{}:{}{}", host, self.port, self.path)
    }

    /// URL of the configured core, e.g. `http://localhost:8983/solr/hub`.
    pub fn core_url(&self) -> String {
        format!("{}/{}", self.base_url(), self.core)
    }
}

/// Connection parameters for an OpenSearch cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSearchParams {
    pub url: String,
    pub index: String,
    pub credentials: Option<Credentials>,
}

/// Engine-specific connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionParams {
    Solr(SolrParams),
    OpenSearch(OpenSearchParams),
    Memory,
}

impl ConnectionParams {
    /// The engine these parameters belong to.
    pub fn engine(&self) -> EngineKind {
        match self {
            Self::Solr(_) => EngineKind::Solr,
            Self::OpenSearch(_) => EngineKind::OpenSearch,
            Self::Memory => EngineKind::Memory,
        }
    }

    /// Human-readable connection target, never including credentials.
    pub fn target(&self) -> String {
        match self {
            Self::Solr(params) => params.core_url(),
            Self::OpenSearch(params) => format!("{}/{}", params.url, params.index),
            Self::Memory => "memory".to_string(),
        }
    }
}

/// Operational defaults applied when callers do not pass explicit options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDefaults {
    pub commit_within_ms: u64,
    pub buffer_size: usize,
    pub request_timeout: Duration,
}

impl Default for IndexDefaults {
    fn default() -> Self {
        Self {
            commit_within_ms: DEFAULT_COMMIT_WITHIN_MS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Configuration for the search index facade.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use search_index_repository::config::{EngineKind, IndexConfig};
///
/// let mut source = HashMap::new();
/// source.insert("engine".to_string(), "solr".to_string());
/// source.insert("solr_host".to_string(), "localhost".to_string());
/// source.insert("solr_core".to_string(), "hub".to_string());
///
/// let config = IndexConfig::resolve(&source).expect("valid configuration");
/// assert_eq!(config.engine, EngineKind::Solr);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub engine: EngineKind,
    pub connection: ConnectionParams,
    pub defaults: IndexDefaults,
}

impl IndexConfig {
    /// Create a configuration from already-typed parts.
    pub fn new(connection: ConnectionParams, defaults: IndexDefaults) -> Self {
        Self {
            engine: connection.engine(),
            connection,
            defaults,
        }
    }

    /// Configuration for the in-process memory engine with default settings.
    pub fn memory() -> Self {
        Self::new(ConnectionParams::Memory, IndexDefaults::default())
    }

    /// Resolve a configuration from a key-value source.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexConfig)` - A validated configuration
    /// * `Err(SearchIndexError::ConfigurationError)` - If the engine is unknown or a
    ///   required parameter is missing or malformed
    pub fn resolve(source: &dyn ConfigSource) -> Result<Self> {
        let engine_name = source
            .get_non_empty(keys::ENGINE)
            .ok_or_else(|| missing(keys::ENGINE))?;
        let engine: EngineKind = engine_name.parse()?;

        let connection = match engine {
            EngineKind::Solr => ConnectionParams::Solr(SolrParams {
                host: required(source, keys::SOLR_HOST)?,
                port: parse_or(source, keys::SOLR_PORT, DEFAULT_SOLR_PORT)?,
                core: required(source, keys::SOLR_CORE)?,
                path: normalize_path(
                    &source
                        .get_non_empty(keys::SOLR_PATH)
                        .unwrap_or_else(|| DEFAULT_SOLR_PATH.to_string()),
                ),
                credentials: credentials(source, keys::SOLR_USERNAME, keys::SOLR_PASSWORD),
            }),
            EngineKind::OpenSearch => ConnectionParams::OpenSearch(OpenSearchParams {
                url: required(source, keys::OPENSEARCH_URL)?,
                index: required(source, keys::OPENSEARCH_INDEX)?,
                credentials: credentials(
                    source,
                    keys::OPENSEARCH_USERNAME,
                    keys::OPENSEARCH_PASSWORD,
                ),
            }),
            EngineKind::Memory => ConnectionParams::Memory,
        };

        let defaults = IndexDefaults {
            commit_within_ms: parse_or(source, keys::COMMIT_WITHIN, DEFAULT_COMMIT_WITHIN_MS)?,
            buffer_size: parse_or(source, keys::BUFFER_SIZE, DEFAULT_BUFFER_SIZE)?,
            request_timeout: Duration::from_secs(parse_or(
                source,
                keys::REQUEST_TIMEOUT_SECS,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        };

        let config = Self {
            engine,
            connection,
            defaults,
        };
        config.validate()?;

        info!(
            engine = %config.engine,
            target = %config.connection.target(),
            commit_within_ms = config.defaults.commit_within_ms,
            buffer_size = config.defaults.buffer_size,
            "Resolved search index configuration"
        );

        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// The connection parameters must belong to the configured engine, required
    /// parameters must be non-empty, and the buffer size and request timeout
    /// must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.connection.engine() != self.engine {
            return Err(SearchIndexError::configuration(format!(
                "Engine '{}' configured with {} connection parameters",
                self.engine,
                self.connection.engine()
            )));
        }

        if self.defaults.buffer_size == 0 {
            return Err(SearchIndexError::configuration(format!(
                "'{}' must be greater than zero",
                keys::BUFFER_SIZE
            )));
        }

        if self.defaults.request_timeout.is_zero() {
            return Err(SearchIndexError::configuration(format!(
                "'{}' must be greater than zero",
                keys::REQUEST_TIMEOUT_SECS
            )));
        }

        match &self.connection {
            ConnectionParams::Solr(params) => {
                ensure_present(keys::SOLR_HOST, &params.host)?;
                ensure_present(keys::SOLR_CORE, &params.core)?;
                if params.core.contains('/') {
                    return Err(SearchIndexError::configuration(format!(
                        "'{}' must be a single core name, got '{}'",
                        keys::SOLR_CORE,
                        params.core
                    )));
                }
                Url::parse(&params.core_url()).map_err(|e| {
                    SearchIndexError::configuration(format!("Invalid Solr address: {}", e))
                })?;
            }
            ConnectionParams::OpenSearch(params) => {
                ensure_present(keys::OPENSEARCH_URL, &params.url)?;
                ensure_present(keys::OPENSEARCH_INDEX, &params.index)?;
                Url::parse(&params.url).map_err(|e| {
                    SearchIndexError::configuration(format!(
                        "Invalid '{}': {}",
                        keys::OPENSEARCH_URL,
                        e
                    ))
                })?;
            }
            ConnectionParams::Memory => {}
        }

        Ok(())
    }
}

fn missing(key: &str) -> SearchIndexError {
    SearchIndexError::configuration(format!("Missing required parameter '{}'", key))
}

fn ensure_present(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(missing(key));
    }
    Ok(())
}

fn required(source: &dyn ConfigSource, key: &str) -> Result<String> {
    source.get_non_empty(key).ok_or_else(|| missing(key))
}

fn parse_or<T: FromStr>(source: &dyn ConfigSource, key: &str, default: T) -> Result<T> {
    match source.get_non_empty(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| {
            SearchIndexError::configuration(format!("Invalid value '{}' for '{}'", raw, key))
        }),
        None => Ok(default),
    }
}

fn credentials(
    source: &dyn ConfigSource,
    username_key: &str,
    password_key: &str,
) -> Option<Credentials> {
    source
        .get_non_empty(username_key)
        .map(|username| Credentials {
            username,
            password: source.get(password_key).filter(|p| !p.is_empty()),
        })
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_engine_kind_parsing() {
        assert_eq!("solr".parse::<EngineKind>().unwrap(), EngineKind::Solr);
        assert_eq!(" OpenSearch ".parse::<EngineKind>().unwrap(), EngineKind::OpenSearch);
        assert_eq!("memory".parse::<EngineKind>().unwrap(), EngineKind::Memory);

        let err = "hubgraph".parse::<EngineKind>().unwrap_err();
        assert!(matches!(err, SearchIndexError::ConfigurationError(_)));
        assert!(err.to_string().contains("solr, opensearch, memory"));
    }

    #[test]
    fn test_resolve_solr_with_defaults() {
        let config = IndexConfig::resolve(&source(&[
            ("engine", "solr"),
            ("solr_host", "localhost"),
            ("solr_core", "hub"),
        ]))
        .unwrap();

        assert_eq!(config.engine, EngineKind::Solr);
        assert_eq!(config.defaults, IndexDefaults::default());
        match config.connection {
            ConnectionParams::Solr(params) => {
                assert_eq!(params.port, 8983);
                assert_eq!(params.path, "/solr");
                assert_eq!(params.core_url(), "http://localhost:8983/solr/hub");
                assert!(params.credentials.is_none());
            }
            other => panic!("unexpected connection params: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_solr_overrides() {
        let config = IndexConfig::resolve(&source(&[
            ("engine", "SOLR"),
            ("solr_host", "https://search.example.org"),
            ("solr_port", "8443"),
            ("solr_core", "hub"),
            ("solr_path", "search/"),
            ("solr_username", "admin"),
            ("solr_password", "secret"),
            ("commit_within", "500"),
            ("buffer_size", "10"),
            ("request_timeout_secs", "5"),
        ]))
        .unwrap();

        assert_eq!(config.defaults.commit_within_ms, 500);
        assert_eq!(config.defaults.buffer_size, 10);
        assert_eq!(config.defaults.request_timeout, Duration::from_secs(5));
        match &config.connection {
            ConnectionParams::Solr(params) => {
                assert_eq!(params.core_url(), "https://search.example.org:8443/search/hub");
                let creds = params.credentials.as_ref().unwrap();
                assert_eq!(creds.username, "admin");
                assert_eq!(creds.password.as_deref(), Some("secret"));
            }
            other => panic!("unexpected connection params: {:?}", other),
        }
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_resolve_unknown_engine() {
        let err = IndexConfig::resolve(&source(&[("engine", "unknown-engine")])).unwrap_err();
        assert!(matches!(err, SearchIndexError::ConfigurationError(_)));
    }

    #[test]
    fn test_resolve_missing_engine() {
        let err = IndexConfig::resolve(&source(&[("solr_host", "localhost")])).unwrap_err();
        assert_eq!(
            err,
            SearchIndexError::configuration("Missing required parameter 'engine'")
        );
    }

    #[test]
    fn test_resolve_missing_required_parameter() {
        let err = IndexConfig::resolve(&source(&[("engine", "solr"), ("solr_host", "localhost")]))
            .unwrap_err();
        assert_eq!(
            err,
            SearchIndexError::configuration("Missing required parameter 'solr_core'")
        );

        let err = IndexConfig::resolve(&source(&[
            ("engine", "opensearch"),
            ("opensearch_url", "http://localhost:9200"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("opensearch_index"));
    }

    #[test]
    fn test_resolve_invalid_number() {
        let err = IndexConfig::resolve(&source(&[("engine", "memory"), ("buffer_size", "lots")]))
            .unwrap_err();
        assert_eq!(
            err,
            SearchIndexError::configuration("Invalid value 'lots' for 'buffer_size'")
        );
    }

    #[test]
    fn test_zero_buffer_size_rejected() {
        let err = IndexConfig::resolve(&source(&[("engine", "memory"), ("buffer_size", "0")]))
            .unwrap_err();
        assert!(matches!(err, SearchIndexError::ConfigurationError(_)));
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let err = IndexConfig::resolve(&source(&[
            ("engine", "memory"),
            ("request_timeout_secs", "0"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            SearchIndexError::configuration("'request_timeout_secs' must be greater than zero")
        );

        let config = IndexConfig::new(
            ConnectionParams::Memory,
            IndexDefaults {
                request_timeout: Duration::ZERO,
                ..IndexDefaults::default()
            },
        );
        assert!(matches!(
            config.validate(),
            Err(SearchIndexError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_resolve_opensearch_invalid_url() {
        let err = IndexConfig::resolve(&source(&[
            ("engine", "opensearch"),
            ("opensearch_url", "not a url"),
            ("opensearch_index", "documents"),
        ]))
        .unwrap_err();
        assert!(matches!(err, SearchIndexError::ConfigurationError(_)));
    }

    #[test]
    fn test_validate_engine_mismatch() {
        let config = IndexConfig {
            engine: EngineKind::Solr,
            connection: ConnectionParams::Memory,
            defaults: IndexDefaults::default(),
        };
        assert!(matches!(
            config.validate(),
            Err(SearchIndexError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/solr"), "/solr");
        assert_eq!(normalize_path("solr/"), "/solr");
        assert_eq!(normalize_path("/"), "");
    }
}
