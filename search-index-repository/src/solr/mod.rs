//! Solr implementation of the index adapter.
//!
//! This module provides a concrete implementation of `IndexAdapter` that talks
//! to a single Solr core over its JSON HTTP API.

mod adapter;
mod response;

pub use adapter::SolrAdapter;
