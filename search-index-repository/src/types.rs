//! Request and response types for search index operations.

use std::fmt;

use serde::Serialize;

use crate::config::{IndexDefaults, DEFAULT_BUFFER_SIZE, DEFAULT_COMMIT_WITHIN_MS};

/// Per-call options for `index`.
///
/// `overwrite` is tri-state: `None` defers to the backend default, `Some(true)`
/// replaces an existing document with the same identifier, `Some(false)` leaves
/// the existing document untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub overwrite: Option<bool>,
    /// Upper bound in milliseconds before written documents are visible to queries.
    pub commit_within_ms: u64,
    /// Maximum number of documents per physical write. Performance hint only.
    pub buffer_size: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            overwrite: None,
            commit_within_ms: DEFAULT_COMMIT_WITHIN_MS,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl IndexOptions {
    /// Options taken from a configuration's operational defaults.
    pub fn from_defaults(defaults: &IndexDefaults) -> Self {
        Self {
            overwrite: None,
            commit_within_ms: defaults.commit_within_ms,
            buffer_size: defaults.buffer_size,
        }
    }

    /// Options used by `update_index`: overwrite forced on.
    pub fn for_update(commit_within_ms: u64) -> Self {
        Self {
            overwrite: Some(true),
            commit_within_ms,
            ..Self::default()
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }

    pub fn with_commit_within_ms(mut self, commit_within_ms: u64) -> Self {
        self.commit_within_ms = commit_within_ms;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Buffer size clamped to at least one document per write.
    pub fn effective_buffer_size(&self) -> usize {
        self.buffer_size.max(1)
    }
}

/// Summary of a successful `index` or `update_index` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    /// Number of documents passed in.
    pub submitted: usize,
    /// Number of documents written by the backend.
    pub committed: usize,
    /// Number of documents left untouched because `overwrite` was `Some(false)`.
    pub skipped: usize,
    /// Number of physical writes issued.
    pub chunks: usize,
}

/// Connection state of an adapter.
///
/// `Faulted` is terminal for the adapter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Faulted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected => f.write_str("connected"),
            Self::Faulted => f.write_str("faulted"),
        }
    }
}

/// Health descriptor returned by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexHealth {
    /// Whether the backend answered and is accepting requests.
    pub reachable: bool,
    /// Adapter connection state after the check.
    pub state: ConnectionState,
    /// Backend-provided detail or the reason the check failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IndexHealth {
    pub fn up(state: ConnectionState) -> Self {
        Self {
            reachable: true,
            state,
            detail: None,
        }
    }

    pub fn down(state: ConnectionState, detail: impl Into<String>) -> Self {
        Self {
            reachable: false,
            state,
            detail: Some(detail.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_options_defaults() {
        let options = IndexOptions::default();
        assert_eq!(options.overwrite, None);
        assert_eq!(options.commit_within_ms, 3000);
        assert_eq!(options.buffer_size, 1500);
    }

    #[test]
    fn test_update_options_force_overwrite() {
        let options = IndexOptions::for_update(500);
        assert_eq!(options.overwrite, Some(true));
        assert_eq!(options.commit_within_ms, 500);
        assert_eq!(options.buffer_size, 1500);
    }

    #[test]
    fn test_effective_buffer_size_never_zero() {
        assert_eq!(IndexOptions::default().with_buffer_size(0).effective_buffer_size(), 1);
        assert_eq!(IndexOptions::default().with_buffer_size(7).effective_buffer_size(), 7);
    }
}
