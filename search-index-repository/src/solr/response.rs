//! Solr JSON response shapes.
//!
//! Only the parts the adapter reads are modeled; everything else is ignored.

use chrono::{DateTime, Utc};
use search_index_shared::LogEntry;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::utils;

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseHeader {
    pub status: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub msg: Option<String>,
}

/// Response to `/update` and to failed requests in general.
#[derive(Debug, Deserialize)]
pub(crate) struct UpdateResponse {
    #[serde(rename = "responseHeader")]
    pub response_header: ResponseHeader,
    pub error: Option<ErrorBody>,
}

/// Response to `/admin/ping`.
#[derive(Debug, Deserialize)]
pub(crate) struct PingResponse {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentList {
    #[serde(rename = "numFound")]
    pub num_found: u64,
    #[serde(default)]
    pub docs: Vec<Map<String, Value>>,
}

/// Response to `/select` and real-time `/get?ids=`.
#[derive(Debug, Deserialize)]
pub(crate) struct SelectResponse {
    pub response: DocumentList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoggingEvent {
    pub time: String,
    pub level: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoggingHistory {
    #[serde(default)]
    pub docs: Vec<LoggingEvent>,
}

/// Response to `/admin/info/logging?since=`.
#[derive(Debug, Deserialize)]
pub(crate) struct LoggingResponse {
    pub history: Option<LoggingHistory>,
}

impl SelectResponse {
    /// String values of `field` across the returned documents.
    pub fn field_values(&self, field: &str) -> Vec<String> {
        self.response
            .docs
            .iter()
            .filter_map(|doc| doc.get(field))
            .filter_map(first_string)
            .collect()
    }
}

/// First string in a value that may be single- or multi-valued.
pub(crate) fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(first_string),
        _ => None,
    }
}

/// Extract the decoded `q` parameter from a Solr request log message.
///
/// Request log lines carry their parameters as `params={q=...&rows=10}`. The
/// parameters are URL-encoded, so the block ends at the first whitespace while
/// braces inside it (range queries such as `[1 TO 5}`) are left raw.
pub(crate) fn query_from_message(message: &str) -> Option<String> {
    let start = message.find("params={")? + "params={".len();
    let rest = &message[start..];
    let block = &rest[..rest.find(char::is_whitespace).unwrap_or(rest.len())];
    let params = block.strip_suffix('}').unwrap_or(block);
    form_urlencoded::parse(params.as_bytes())
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.into_owned())
}

impl LoggingResponse {
    /// Query-log entries, in the order Solr reported them.
    ///
    /// Events that are not search requests, or whose time cannot be parsed, are
    /// skipped.
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.history
            .map(|history| history.docs)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|event| {
                let message = event.message?;
                let query = query_from_message(&message)?;
                let timestamp: DateTime<Utc> = utils::parse_timestamp(&event.time).ok()?;
                Some(LogEntry {
                    timestamp,
                    query,
                    level: event.level,
                    message: Some(message),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_from_message() {
        let message = "[hub]  webapp=/solr path=/select params={q=title:hello+world&wt=json&rows=10} hits=3 status=0 QTime=1";
        assert_eq!(
            query_from_message(message),
            Some("title:hello world".to_string())
        );
        assert_eq!(
            query_from_message("params={q=%22exact+phrase%22}"),
            Some("\"exact phrase\"".to_string())
        );
        assert_eq!(
            query_from_message(
                "[hub] webapp=/solr path=/select params={q=price:[1+TO+5}&fq={!tag%3Dt}cat:x} hits=4 status=0 QTime=2"
            ),
            Some("price:[1 TO 5}".to_string())
        );
        assert_eq!(
            query_from_message("params={q=price:{1+TO+5]}"),
            Some("price:{1 TO 5]".to_string())
        );
        assert_eq!(query_from_message("params={wt=json}"), None);
        assert_eq!(query_from_message("Opening new searcher"), None);
    }

    #[test]
    fn test_logging_response_into_entries() {
        let body = json!({
            "history": {
                "numFound": 3,
                "docs": [
                    {
                        "time": "2024-03-01T12:00:00.123Z",
                        "level": "INFO",
                        "logger": "org.apache.solr.core.SolrCore.Request",
                        "message": "[hub] webapp=/solr path=/select params={q=physics} hits=2 status=0 QTime=3"
                    },
                    {
                        "time": "2024-03-01T12:00:01Z",
                        "level": "WARN",
                        "message": "Slow commit"
                    },
                    {
                        "time": "garbage",
                        "level": "INFO",
                        "message": "params={q=ignored}"
                    }
                ]
            }
        });

        let parsed: LoggingResponse = serde_json::from_value(body).unwrap();
        let entries = parsed.into_entries();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query, "physics");
        assert_eq!(entries[0].level.as_deref(), Some("INFO"));
    }

    #[test]
    fn test_logging_response_without_history() {
        let parsed: LoggingResponse = serde_json::from_value(json!({"watcher": "Log4j2"})).unwrap();
        assert!(parsed.into_entries().is_empty());
    }

    #[test]
    fn test_field_values_handles_multi_valued() {
        let body = json!({
            "response": {
                "numFound": 2,
                "docs": [
                    {"id": "a", "timestamp": ["2024-01-01T00:00:00Z"]},
                    {"id": 7}
                ]
            }
        });
        let parsed: SelectResponse = serde_json::from_value(body).unwrap();

        assert_eq!(parsed.field_values("id"), vec!["a", "7"]);
        assert_eq!(parsed.field_values("timestamp"), vec!["2024-01-01T00:00:00Z"]);
    }
}
