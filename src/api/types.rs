//! Response types for the Dune execution API.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One raw result row: a mapping from column name to raw value.
pub type DuneRecord = Map<String, Value>;

/// Acknowledgement returned when an execution is submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponse {
    pub execution_id: String,
    #[serde(default)]
    pub state: String,
}

/// Status probe for a running execution.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub execution_id: String,
    pub state: String,
}

/// A finished (or still payload-less) execution. `result` is `None` when
/// the backend realized no payload for this execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub result: Option<ExecutionPayload>,
}

impl ExecutionResult {
    /// Rows in backend order; empty when there is no payload.
    pub fn into_rows(self) -> Vec<DuneRecord> {
        self.result.map(|r| r.rows).unwrap_or_default()
    }
}

/// Realized result payload: ordered rows plus opaque metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionPayload {
    #[serde(default)]
    pub rows: Vec<DuneRecord>,
    #[serde(default)]
    pub metadata: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_rows_without_payload() {
        let result: ExecutionResult =
            serde_json::from_value(serde_json::json!({ "execution_id": "01GX" })).unwrap();
        assert!(result.result.is_none());
        assert!(result.into_rows().is_empty());
    }

    #[test]
    fn test_into_rows_preserves_order() {
        let result: ExecutionResult = serde_json::from_value(serde_json::json!({
            "execution_id": "01GX",
            "state": "QUERY_STATE_COMPLETED",
            "result": {
                "rows": [{ "tx_hash": "0xaaa" }, { "tx_hash": "0xbbb" }],
                "metadata": { "row_count": 2 }
            }
        }))
        .unwrap();

        let rows = result.into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["tx_hash"], "0xaaa");
        assert_eq!(rows[1]["tx_hash"], "0xbbb");
    }
}
