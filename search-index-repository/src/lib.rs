//! # Search Index Repository
//!
//! This crate provides the adapter contract for search backends, the concrete
//! adapters (Solr, OpenSearch and an in-process memory index), the engine
//! registry, configuration resolution and the [`SearchIndex`] facade that
//! ties them together.

pub mod config;
pub mod connection;
pub mod errors;
pub mod facade;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod registry;
pub mod solr;
pub mod types;
pub mod utils;

pub use config::{ConfigSource, EngineKind, EnvSource, IndexConfig, IndexDefaults};
pub use errors::SearchIndexError;
pub use facade::SearchIndex;
pub use interfaces::IndexAdapter;
pub use memory::MemoryAdapter;
pub use opensearch::OpenSearchAdapter;
pub use solr::SolrAdapter;
pub use types::{ConnectionState, IndexHealth, IndexOptions, IndexSummary};
