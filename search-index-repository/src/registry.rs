//! Engine registry.
//!
//! Maps each [`EngineKind`] to the factory that builds its adapter. The match is
//! exhaustive, so adding an engine variant without an adapter does not compile.

use std::sync::Arc;

use crate::config::{EngineKind, IndexConfig};
use crate::errors::Result;
use crate::interfaces::IndexAdapter;
use crate::memory::MemoryAdapter;
use crate::opensearch::OpenSearchAdapter;
use crate::solr::SolrAdapter;

/// Builds an adapter from a validated configuration.
pub type AdapterFactory = fn(Arc<IndexConfig>) -> Result<Box<dyn IndexAdapter>>;

/// Factory for `engine`.
pub fn factory_for(engine: EngineKind) -> AdapterFactory {
    match engine {
        EngineKind::Solr => build_solr,
        EngineKind::OpenSearch => build_opensearch,
        EngineKind::Memory => build_memory,
    }
}

/// Names accepted for the `engine` key.
pub fn supported_engines() -> Vec<&'static str> {
    EngineKind::ALL.iter().map(|engine| engine.as_str()).collect()
}

fn build_solr(config: Arc<IndexConfig>) -> Result<Box<dyn IndexAdapter>> {
    Ok(Box::new(SolrAdapter::new(config)?))
}

fn build_opensearch(config: Arc<IndexConfig>) -> Result<Box<dyn IndexAdapter>> {
    Ok(Box::new(OpenSearchAdapter::new(config)?))
}

fn build_memory(_config: Arc<IndexConfig>) -> Result<Box<dyn IndexAdapter>> {
    Ok(Box::new(MemoryAdapter::new()))
}
