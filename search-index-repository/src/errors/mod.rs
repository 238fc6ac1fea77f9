//! Error types for the search index repository.
//!
//! This module provides a unified error type for all search index operations.

mod search_index_error;

pub use search_index_error::SearchIndexError;

/// Result alias used throughout the repository crate.
pub type Result<T> = std::result::Result<T, SearchIndexError>;
