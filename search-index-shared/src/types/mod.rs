//! This module defines the core data structures shared across the search index crates.
//! It re-exports the document model and the reporting types.

pub mod document;
pub mod log_entry;

pub use document::{Document, DocumentId, FieldValue};
pub use log_entry::{LastInsert, LogEntry};
