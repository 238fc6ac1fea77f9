//! # Search Index
//!
//! Administrative command line for the search index facade. It resolves the
//! backend from `SEARCH_*` environment variables and runs one maintenance
//! command against it.
//!
//! ## Modules
//!
//! - [`command`]: Command parsing and execution
//! - [`errors`]: Error types for the command line

pub mod command;
pub mod errors;

pub use command::Command;
pub use errors::CliError;
