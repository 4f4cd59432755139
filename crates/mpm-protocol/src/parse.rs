//! Normalization of raw process-list payloads.
//!
//! The backend forwards `SHOW FULL PROCESSLIST` rows as-is, so field names
//! follow MySQL's casing (`Id`, `User`, `db`, ...) and values are loosely
//! typed. Everything here turns that into canonical [`Process`] records or
//! rejects the whole payload.

use chrono::{DateTime, Utc};
use mpm_core::{DomainError, DomainResult, Process, ProcessId, ProcessTime, Snapshot};
use serde::Deserialize;
use serde_json::Value;

/// One process-list row as received.
///
/// Every field is optional so that a missing column can be reported
/// (or defaulted) during conversion instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProcess {
    #[serde(default, alias = "Id", alias = "ID")]
    pub id: Option<Value>,
    #[serde(default, alias = "User")]
    pub user: Option<Value>,
    #[serde(default, alias = "Host")]
    pub host: Option<Value>,
    #[serde(default, alias = "Db", alias = "DB")]
    pub db: Option<Value>,
    #[serde(default, alias = "Command")]
    pub command: Option<Value>,
    #[serde(default, alias = "Time")]
    pub time: Option<Value>,
    #[serde(default, alias = "State")]
    pub state: Option<Value>,
    #[serde(default, alias = "Info")]
    pub info: Option<Value>,
    #[serde(default, alias = "CPU", alias = "Cpu")]
    pub cpu: Option<Value>,
    #[serde(default, alias = "Memory")]
    pub memory: Option<Value>,
}

impl RawProcess {
    /// Converts to a canonical process.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MalformedSnapshot` if the id is missing or is
    /// not a non-negative integer.
    pub fn to_process(&self) -> DomainResult<Process> {
        Ok(Process {
            id: parse_id(self.id.as_ref())?,
            user: text(self.user.as_ref()).unwrap_or_default(),
            host: text(self.host.as_ref()).unwrap_or_default(),
            db: optional_text(self.db.as_ref()),
            command: text(self.command.as_ref()).unwrap_or_default(),
            time: parse_time(self.time.as_ref()),
            state: optional_text(self.state.as_ref()),
            info: optional_text(self.info.as_ref()),
            cpu: metric(self.cpu.as_ref()),
            memory: metric(self.memory.as_ref()),
        })
    }
}

/// Normalizes a decoded `GET /processes` payload into a snapshot.
///
/// All-or-nothing: one bad row rejects the whole payload.
pub fn normalize_snapshot(payload: Value, captured_at: DateTime<Utc>) -> DomainResult<Snapshot> {
    let Value::Array(rows) = payload else {
        return Err(DomainError::malformed(format!(
            "expected a list of processes, got {}",
            kind(&payload)
        )));
    };

    let mut processes = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        if !row.is_object() {
            return Err(DomainError::malformed(format!(
                "row {idx} is {}, expected an object",
                kind(&row)
            )));
        }
        let raw: RawProcess = serde_json::from_value(row)
            .map_err(|e| DomainError::malformed(format!("row {idx}: {e}")))?;
        let process = raw
            .to_process()
            .map_err(|e| DomainError::malformed(format!("row {idx}: {}", reason(&e))))?;
        processes.push(process);
    }

    Snapshot::new(processes, captured_at)
}

/// Decodes and normalizes a raw response body.
pub fn parse_snapshot(body: &[u8], captured_at: DateTime<Utc>) -> DomainResult<Snapshot> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| DomainError::malformed(format!("invalid JSON: {e}")))?;
    normalize_snapshot(payload, captured_at)
}

// ============================================================================
// Field coercion
// ============================================================================

fn parse_id(value: Option<&Value>) -> DomainResult<ProcessId> {
    let id = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match (id, value) {
        (Some(id), _) => Ok(ProcessId::new(id)),
        (None, None | Some(Value::Null)) => Err(DomainError::malformed("missing process id")),
        (None, Some(other)) => Err(DomainError::malformed(format!("invalid process id {other}"))),
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    text(value).filter(|s| !s.trim().is_empty())
}

fn parse_time(value: Option<&Value>) -> ProcessTime {
    match value {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(secs) => ProcessTime::Seconds(secs),
            None => ProcessTime::Text(n.to_string()),
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                ProcessTime::default()
            } else {
                trimmed
                    .parse::<u64>()
                    .map(ProcessTime::Seconds)
                    .unwrap_or_else(|_| ProcessTime::Text(trimmed.to_string()))
            }
        }
        Some(other) if !other.is_null() => ProcessTime::Text(other.to_string()),
        _ => ProcessTime::default(),
    }
}

// Anything that is not a finite, non-negative number becomes zero.
fn metric(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn reason(err: &DomainError) -> String {
    match err {
        DomainError::MalformedSnapshot { reason } => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(payload: Value) -> DomainResult<Snapshot> {
        normalize_snapshot(payload, Utc::now())
    }

    #[test]
    fn test_mysql_casing() {
        let payload = json!([{
            "Id": 12,
            "User": "app",
            "Host": "10.0.0.5:51234",
            "db": "shop",
            "Command": "Query",
            "Time": 3,
            "State": "Sending data",
            "Info": "SELECT * FROM orders",
            "CPU": 4.25,
            "Memory": 128.0
        }]);
        let snapshot = normalize(payload).unwrap();
        let p = snapshot.get(ProcessId::new(12)).unwrap();
        assert_eq!(p.user, "app");
        assert_eq!(p.host, "10.0.0.5:51234");
        assert_eq!(p.db.as_deref(), Some("shop"));
        assert_eq!(p.time, ProcessTime::Seconds(3));
        assert_eq!(p.state.as_deref(), Some("Sending data"));
        assert!((p.cpu - 4.25).abs() < f64::EPSILON);
        assert!((p.memory - 128.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lowercase_fields() {
        let payload = json!([{"id": 1, "user": "a", "command": "Sleep", "cpu": 10, "memory": 5}]);
        let snapshot = normalize(payload).unwrap();
        let p = snapshot.get(ProcessId::new(1)).unwrap();
        assert_eq!(p.user, "a");
        assert_eq!(p.command, "Sleep");
        assert!((p.cpu - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_optional_fields_become_none() {
        let payload = json!([{"Id": 1, "db": null, "State": "", "Info": "  "}]);
        let snapshot = normalize(payload).unwrap();
        let p = snapshot.get(ProcessId::new(1)).unwrap();
        assert_eq!(p.db, None);
        assert_eq!(p.state, None);
        assert_eq!(p.info, None);
        assert_eq!(p.user, "");
        assert_eq!(p.time, ProcessTime::Seconds(0));
    }

    #[test]
    fn test_bad_metrics_coerce_to_zero() {
        let payload = json!([
            {"Id": 1, "CPU": "abc", "Memory": -4.0},
            {"Id": 2, "CPU": "2.5", "Memory": null},
            {"Id": 3, "CPU": true}
        ]);
        let snapshot = normalize(payload).unwrap();
        let cpus: Vec<f64> = snapshot.processes().iter().map(|p| p.cpu).collect();
        let mems: Vec<f64> = snapshot.processes().iter().map(|p| p.memory).collect();
        assert_eq!(cpus, vec![0.0, 2.5, 0.0]);
        assert_eq!(mems, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_time_variants() {
        let payload = json!([
            {"Id": 1, "Time": "17"},
            {"Id": 2, "Time": "00:01:02"},
            {"Id": 3, "Time": -1}
        ]);
        let snapshot = normalize(payload).unwrap();
        let times: Vec<ProcessTime> = snapshot.processes().iter().map(|p| p.time.clone()).collect();
        assert_eq!(
            times,
            vec![
                ProcessTime::Seconds(17),
                ProcessTime::Text("00:01:02".to_string()),
                ProcessTime::Text("-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_id_accepted() {
        let snapshot = normalize(json!([{"Id": " 42 "}])).unwrap();
        assert!(snapshot.contains(ProcessId::new(42)));
    }

    #[test]
    fn test_missing_id_rejects_snapshot() {
        let err = normalize(json!([{"Id": 1}, {"User": "x"}])).unwrap_err();
        match err {
            DomainError::MalformedSnapshot { reason } => {
                assert!(reason.contains("row 1"));
                assert!(reason.contains("missing process id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_id_rejects_snapshot() {
        assert!(normalize(json!([{"Id": "abc"}])).is_err());
        assert!(normalize(json!([{"Id": -3}])).is_err());
        assert!(normalize(json!([{"Id": 1.5}])).is_err());
    }

    #[test]
    fn test_duplicate_id_rejects_snapshot() {
        let err = normalize(json!([{"Id": 1}, {"Id": 1}])).unwrap_err();
        assert!(matches!(err, DomainError::MalformedSnapshot { .. }));
    }

    #[test]
    fn test_non_list_payload_rejected() {
        let err = normalize(json!({"detail": "nope"})).unwrap_err();
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn test_non_object_row_rejected() {
        let err = normalize(json!([{"Id": 1}, 7])).unwrap_err();
        assert!(err.to_string().contains("row 1 is a number"));
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert!(normalize(json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_snapshot_invalid_json() {
        let err = parse_snapshot(b"[{", Utc::now()).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let snapshot = normalize(json!([{"Id": 1, "Progress": 0.0, "Rows_sent": 3}])).unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_non_string_text_stringified() {
        let snapshot = normalize(json!([{"Id": 1, "User": 5, "Info": 12}])).unwrap();
        let p = snapshot.get(ProcessId::new(1)).unwrap();
        assert_eq!(p.user, "5");
        assert_eq!(p.info.as_deref(), Some("12"));
    }
}
