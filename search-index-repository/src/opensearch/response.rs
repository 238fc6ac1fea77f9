//! OpenSearch JSON response shapes.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::utils::ChunkOutcome;

/// One item of a `_bulk` response, keyed by its action name.
#[derive(Debug, Deserialize)]
pub(crate) struct BulkItem {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub status: u16,
    pub error: Option<Value>,
}

/// Response to `_bulk`.
#[derive(Debug, Deserialize)]
pub(crate) struct BulkResponse {
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkItem>>,
}

impl BulkResponse {
    /// Tally the items of a bulk response.
    ///
    /// `sent_ids` are the identifiers in request order, used when an item does
    /// not echo its `_id`. A 409 on a `create` action means the document already
    /// existed and counts as skipped.
    pub fn into_outcome(self, sent_ids: &[String]) -> ChunkOutcome {
        let mut outcome = ChunkOutcome::default();
        if !self.errors {
            outcome.committed = self.items.len();
            return outcome;
        }

        for (position, entry) in self.items.into_iter().enumerate() {
            for (action, item) in entry {
                if (200..300).contains(&item.status) {
                    outcome.committed += 1;
                } else if action == "create" && item.status == 409 {
                    outcome.skipped += 1;
                } else {
                    let id = item
                        .id
                        .or_else(|| sent_ids.get(position).cloned())
                        .unwrap_or_default();
                    debug!(id = %id, status = item.status, error = ?item.error, "Bulk item failed");
                    outcome.failed_ids.push(id);
                }
            }
        }
        outcome
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TotalHits {
    pub value: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hit {
    #[serde(rename = "_source", default)]
    pub source: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hits {
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Response to `_search`.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub hits: Hits,
}

impl SearchResponse {
    /// String value of `field` in the first hit.
    pub fn first_value(&self, field: &str) -> Option<&str> {
        if self.hits.total.as_ref().map(|t| t.value) == Some(0) {
            return None;
        }
        self.hits.hits.first()?.source.get(field)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_without_errors() {
        let body = json!({
            "took": 3,
            "errors": false,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 200}}
            ]
        });
        let parsed: BulkResponse = serde_json::from_value(body).unwrap();
        assert_eq!(
            parsed.into_outcome(&["a".to_string(), "b".to_string()]),
            ChunkOutcome::all_committed(2)
        );
    }

    #[test]
    fn test_bulk_with_conflicts_and_failures() {
        let body = json!({
            "took": 5,
            "errors": true,
            "items": [
                {"create": {"_id": "a", "status": 201}},
                {"create": {"_id": "b", "status": 409, "error": {"type": "version_conflict_engine_exception"}}},
                {"create": {"_id": "c", "status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]
        });
        let parsed: BulkResponse = serde_json::from_value(body).unwrap();
        let outcome = parsed.into_outcome(&[]);

        assert_eq!(outcome.committed, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.failed_ids, vec!["c"]);
    }

    #[test]
    fn test_bulk_conflict_on_index_is_failure() {
        let body = json!({
            "errors": true,
            "items": [{"index": {"status": 429, "error": {"type": "es_rejected_execution_exception"}}}]
        });
        let parsed: BulkResponse = serde_json::from_value(body).unwrap();
        let outcome = parsed.into_outcome(&["only".to_string()]);
        assert_eq!(outcome.failed_ids, vec!["only"]);
    }

    #[test]
    fn test_search_first_value() {
        let body = json!({
            "hits": {
                "total": {"value": 12, "relation": "eq"},
                "hits": [{"_id": "x", "_source": {"indexed_at": "2024-03-01T12:00:00.000Z"}}]
            }
        });
        let parsed: SearchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.first_value("indexed_at"), Some("2024-03-01T12:00:00.000Z"));

        let empty: SearchResponse =
            serde_json::from_value(json!({"hits": {"total": {"value": 0}, "hits": []}})).unwrap();
        assert_eq!(empty.first_value("indexed_at"), None);
    }
}
