//! Interface definitions for search index adapters.
//!
//! This module defines the abstract `IndexAdapter` trait that every backend
//! implementation satisfies, so the facade can hold any of them behind one API.

mod index_adapter;

pub use index_adapter::IndexAdapter;
