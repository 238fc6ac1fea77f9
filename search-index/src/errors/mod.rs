//! Error types for the search index command line.

use search_index_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur while parsing or running a command.
#[derive(Error, Debug)]
pub enum CliError {
    /// The command line could not be understood.
    #[error("Usage error: {0}")]
    UsageError(String),

    /// A document file could not be read or decoded.
    #[error("Input error: {0}")]
    InputError(String),

    /// The search index rejected or failed the operation.
    #[error("Search index error: {0}")]
    SearchIndex(#[from] SearchIndexError),
}

impl CliError {
    /// Create a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::UsageError(msg.into())
    }

    /// Create an input error.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InputError(msg.into())
    }
}
