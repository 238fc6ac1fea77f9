//! Query log and last-insert types.
//!
//! These are the response structures for the reporting side of the index
//! contract: query-log retrieval and the timestamp of the latest write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single query-log record reported by a search backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// When the backend handled the query.
    pub timestamp: DateTime<Utc>,

    /// The query string as received by the backend.
    pub query: String,

    /// Backend log level, if the engine reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// The raw log message the query was extracted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, query: impl Into<String>) -> Self {
        Self {
            timestamp,
            query: query.into(),
            level: None,
            message: None,
        }
    }
}

/// Timestamp of the most recently committed document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "timestamp", rename_all = "snake_case")]
pub enum LastInsert {
    At(DateTime<Utc>),
    /// The backend cannot report it, or the index holds no documents.
    Unknown,
}

impl LastInsert {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(ts) => Some(*ts),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::At(_))
    }
}

impl From<Option<DateTime<Utc>>> for LastInsert {
    fn from(ts: Option<DateTime<Utc>>) -> Self {
        ts.map(Self::At).unwrap_or(Self::Unknown)
    }
}
