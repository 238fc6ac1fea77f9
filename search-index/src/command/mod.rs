//! Maintenance commands.

use std::path::{Path, PathBuf};

use search_index_repository::SearchIndex;
use search_index_shared::{Document, DocumentId};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::CliError;

pub const USAGE: &str =
    "usage: search-index <status | optimize | last-insert | logs | index <file.json> | delete <id>>";

/// One command-line invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Optimize,
    LastInsert,
    Logs,
    /// Index the documents in a JSON file holding one document or an array.
    Index(PathBuf),
    Delete(DocumentId),
}

impl Command {
    /// Parse the arguments that follow the program name.
    pub fn parse<I, S>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let command = match args.as_slice() {
            [name] if name == "status" => Self::Status,
            [name] if name == "optimize" => Self::Optimize,
            [name] if name == "last-insert" => Self::LastInsert,
            [name] if name == "logs" => Self::Logs,
            [name, path] if name == "index" => Self::Index(PathBuf::from(path)),
            [name, id] if name == "delete" => {
                let id = DocumentId::from(id.as_str());
                if !id.is_valid() {
                    return Err(CliError::usage("delete needs a non-empty identifier"));
                }
                Self::Delete(id)
            }
            [] => return Err(CliError::usage(USAGE)),
            other => {
                return Err(CliError::usage(format!(
                    "unknown command '{}'; {}",
                    other.join(" "),
                    USAGE
                )))
            }
        };
        Ok(command)
    }

    /// Run the command and return its JSON report.
    pub async fn run(&self, index: &SearchIndex) -> Result<Value, CliError> {
        let report = match self {
            Self::Status => {
                let health = index.status().await;
                json!({ "engine": index.engine(), "status": health })
            }
            Self::Optimize => {
                index.optimize().await?;
                json!({ "engine": index.engine(), "optimized": true })
            }
            Self::LastInsert => {
                let last_insert = index.last_insert().await?;
                json!({ "engine": index.engine(), "last_insert": last_insert })
            }
            Self::Logs => {
                let logs = index.get_logs().await?;
                json!({ "engine": index.engine(), "logs": logs })
            }
            Self::Index(path) => {
                let documents = load_documents(path).await?;
                info!(path = %path.display(), count = documents.len(), "Indexing documents");
                let summary = index.index_with_defaults(&documents).await?;
                json!({ "engine": index.engine(), "summary": summary })
            }
            Self::Delete(id) => {
                index.delete(id).await?;
                json!({ "engine": index.engine(), "deleted": id })
            }
        };
        Ok(report)
    }
}

/// Read documents from a JSON file holding a single document or an array.
pub async fn load_documents(path: &Path) -> Result<Vec<Document>, CliError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::input(format!("{}: {}", path.display(), e)))?;
    parse_documents(&raw).map_err(|e| CliError::input(format!("{}: {}", path.display(), e)))
}

fn parse_documents(raw: &str) -> Result<Vec<Document>, serde_json::Error> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => items.into_iter().map(serde_json::from_value).collect(),
        single => Ok(vec![serde_json::from_value(single)?]),
    }
}
