//! # Search Index Shared
//!
//! This crate defines the data structures passed across the search index facade:
//! the normalized [`Document`] submitted for indexing, and the [`LogEntry`] and
//! [`LastInsert`] values reported back by backends.

pub mod types;

pub use types::{Document, DocumentId, FieldValue, LastInsert, LogEntry};
