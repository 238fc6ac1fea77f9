//! OpenSearch implementation of the index adapter.

mod adapter;
mod response;

pub use adapter::OpenSearchAdapter;
