//! Request and response bodies for the backend HTTP API.

use mpm_core::ProcessId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `POST /kill` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillRequest {
    pub process_ids: Vec<ProcessId>,
}

impl KillRequest {
    pub fn new(process_ids: Vec<ProcessId>) -> Self {
        Self { process_ids }
    }
}

/// Per-id kill failure reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillFailure {
    pub id: ProcessId,
    #[serde(default)]
    pub error: String,
}

/// `POST /kill` response. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub killed: Vec<ProcessId>,
    #[serde(default)]
    pub failed: Vec<KillFailure>,
}

impl KillResponse {
    /// One-line summary for the status bar.
    pub fn summary(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_string();
        }
        match (self.killed.len(), self.failed.len()) {
            (0, 0) => "Kill request sent".to_string(),
            (killed, 0) => format!("Killed {killed} process(es)"),
            (killed, failed) => format!("Killed {killed} process(es), {failed} failed"),
        }
    }
}

/// `POST /execute` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
}

/// `POST /execute` response.
///
/// Row-returning statements (`SELECT`, `SHOW`) yield `Rows`; everything
/// else yields a `Message` with the affected row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecuteResult {
    Rows {
        columns: Vec<String>,
        data: Vec<Map<String, Value>>,
    },
    Message {
        message: String,
    },
}

impl ExecuteResult {
    pub fn row_count(&self) -> usize {
        match self {
            Self::Rows { data, .. } => data.len(),
            Self::Message { .. } => 0,
        }
    }
}

/// Body shared by `POST /explain` and `POST /recommend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// `POST /explain` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainResponse {
    /// Raw `EXPLAIN` rows, column name to value.
    #[serde(default)]
    pub plan: Vec<Map<String, Value>>,
    /// Human-readable hints derived from the plan.
    #[serde(default)]
    pub interpretation: Vec<String>,
}

/// `POST /recommend` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendResponse {
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// `GET /ping` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    #[serde(default)]
    pub db: String,
}

/// `POST /login` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Error body returned with non-2xx responses.
///
/// `detail` is usually a string but validation errors carry a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Value,
}

impl ErrorBody {
    /// Flattens `detail` into a single line.
    pub fn detail_text(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| item.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

/// Renders a JSON cell for table display.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_request_serialization() {
        let req = KillRequest::new(vec![ProcessId::new(2), ProcessId::new(5)]);
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"process_ids":[2,5]}"#);
    }

    #[test]
    fn test_kill_response_partial_failure() {
        let json = r#"{
            "status": "success",
            "killed": [2],
            "failed": [{"id": 3, "error": "Unknown thread id: 3"}]
        }"#;
        let resp: KillResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.killed, vec![ProcessId::new(2)]);
        assert_eq!(resp.failed.len(), 1);
        assert_eq!(resp.summary(), "Killed 1 process(es), 1 failed");
    }

    #[test]
    fn test_kill_response_message_only() {
        let resp: KillResponse =
            serde_json::from_str(r#"{"message": "Processes killed"}"#).unwrap();
        assert!(resp.killed.is_empty());
        assert_eq!(resp.summary(), "Processes killed");
    }

    #[test]
    fn test_execute_request_omits_missing_db() {
        let req = ExecuteRequest {
            query: "SELECT 1".to_string(),
            db: None,
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"query":"SELECT 1"}"#
        );
    }

    #[test]
    fn test_execute_result_rows() {
        let json = r#"{"data": [{"a": 1, "b": null}], "columns": ["a", "b"]}"#;
        let result: ExecuteResult = serde_json::from_str(json).unwrap();
        match result {
            ExecuteResult::Rows { columns, data } => {
                assert_eq!(columns, vec!["a", "b"]);
                assert_eq!(data.len(), 1);
            }
            ExecuteResult::Message { .. } => panic!("expected rows"),
        }
    }

    #[test]
    fn test_execute_result_message() {
        let json = r#"{"message": "Query executed successfully. Rows affected: 3"}"#;
        let result: ExecuteResult = serde_json::from_str(json).unwrap();
        assert!(matches!(result, ExecuteResult::Message { .. }));
        assert_eq!(result.row_count(), 0);
    }

    #[test]
    fn test_explain_response_defaults() {
        let resp: ExplainResponse = serde_json::from_str(r#"{"interpretation": ["ok"]}"#).unwrap();
        assert!(resp.plan.is_empty());
        assert_eq!(resp.interpretation, vec!["ok"]);
    }

    #[test]
    fn test_error_body_detail_text() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "boom"}"#).unwrap();
        assert_eq!(body.detail_text(), "boom");

        let body: ErrorBody = serde_json::from_str(
            r#"{"detail": [{"loc": ["body", "query"], "msg": "field required"}]}"#,
        )
        .unwrap();
        assert_eq!(body.detail_text(), "field required");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Value::Null), "NULL");
        assert_eq!(cell_text(&Value::from("x")), "x");
        assert_eq!(cell_text(&Value::from(3)), "3");
    }
}
