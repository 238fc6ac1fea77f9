//! Search index error types.
//!
//! This module defines the unified error taxonomy shared by the facade and every
//! adapter. Each variant documents who raises it and whether a retry is safe.

use thiserror::Error;

/// Unified errors from search index operations.
///
/// Used by the `IndexAdapter` trait and the `SearchIndex` facade. The facade only
/// ever originates `ConfigurationError`; every other variant comes from an adapter
/// and is passed through untouched.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SearchIndexError {
    /// Unknown engine name or missing/invalid connection parameter.
    ///
    /// Raised only while constructing the facade. Never retried.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Backend unreachable or authentication rejected.
    ///
    /// The adapter is faulted afterwards; reconstruct the facade to retry.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Single-call failure (timeout, malformed response, overload).
    ///
    /// Adapter state is unchanged and the same call is safe to retry.
    #[error("Transient request error: {0}")]
    TransientRequestError(String),

    /// Malformed document, rejected before any network call.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A document could not be rendered into the backend's wire format.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Part of a batch failed. The committed portion is durable.
    #[error("Partial batch failure: {} failed, {committed} committed", .failed_ids.len())]
    PartialBatchError {
        failed_ids: Vec<String>,
        committed: usize,
    },
}

impl SearchIndexError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a transient request error.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientRequestError(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a partial batch error.
    pub fn partial_batch(failed_ids: Vec<String>, committed: usize) -> Self {
        Self::PartialBatchError {
            failed_ids,
            committed,
        }
    }

    /// Whether repeating the same call may succeed without any other change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientRequestError(_))
    }

    /// Whether the error moves an adapter into its terminal faulted state.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}
