//! Wrapper around a decoded DSL response.
//!
//! # Example
//!
//! ```
//! use dimensions_client::DslResult;
//! use serde_json::json;
//!
//! let res = DslResult::from_value(200, json!({
//!     "publications": [{"id": "pub.1"}, {"id": "pub.2"}],
//!     "_stats": {"total_count": 2}
//! })).unwrap();
//!
//! assert_eq!(res.get("publications").count(), Some(2));
//! assert!(res.get("grants").is_absent());
//! assert_eq!(res.stats().get("total_count"), Some(&json!(2)));
//! assert_eq!(res.keys_and_count(), vec![("publications".to_string(), 2)]);
//! ```

use crate::error::{DslError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Key holding query execution metadata.
pub const STATS_KEY: &str = "_stats";
/// Key holding DSL warnings.
pub const WARNINGS_KEY: &str = "_warnings";
/// Key present when the DSL reports an application error.
pub const ERRORS_KEY: &str = "errors";

/// Outcome of a forgiving key lookup.
///
/// A missing key is not an error: interactive code can probe a result without
/// handling failures, and still tell "absent" apart from a JSON `null` or `false`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    Absent,
}

impl<'a> Lookup<'a> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    /// The value, if present.
    pub fn value(self) -> Option<&'a Value> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::Absent => None,
        }
    }

    /// The value as an array, if present and sequence-valued.
    pub fn as_array(self) -> Option<&'a Vec<Value>> {
        self.value().and_then(Value::as_array)
    }

    /// Number of items for sequence-valued entries.
    pub fn count(self) -> Option<usize> {
        self.as_array().map(Vec::len)
    }

    /// Look up a key inside an object-valued entry.
    pub fn get(self, key: &str) -> Option<&'a Value> {
        self.value().and_then(|v| v.get(key))
    }
}

/// A decoded DSL response.
///
/// Built once per completed query (after any retries) and never modified.
/// `data` keeps the server's key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DslResult {
    status: u16,
    data: Map<String, Value>,
}

impl DslResult {
    /// Wrap an already-decoded JSON object.
    pub fn new(status: u16, data: Map<String, Value>) -> Self {
        Self { status, data }
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(status: u16, value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Ok(Self::new(status, data)),
            other => Err(DslError::Query(format!(
                "expected a JSON object from the DSL endpoint, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Decode a response body.
    pub fn from_body(status: u16, body: &str) -> Result<Self> {
        Self::from_value(status, serde_json::from_str(body)?)
    }

    /// HTTP status of the response (200, 400 or 500).
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The decoded body.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_data(self) -> Map<String, Value> {
        self.data
    }

    /// Key-style access.
    pub fn get(&self, key: &str) -> Lookup<'_> {
        match self.data.get(key) {
            Some(v) => Lookup::Found(v),
            None => Lookup::Absent,
        }
    }

    /// Attribute-style access: same as [`get`](Self::get), except that `stats`
    /// reads the `_stats` key.
    pub fn attr(&self, name: &str) -> Lookup<'_> {
        match name {
            "stats" => self.get(STATS_KEY),
            _ => self.get(name),
        }
    }

    /// The `_stats` entry.
    pub fn stats(&self) -> Lookup<'_> {
        self.get(STATS_KEY)
    }

    /// `_stats.total_count`, if reported.
    pub fn total_count(&self) -> Option<u64> {
        self.stats().get("total_count").and_then(Value::as_u64)
    }

    /// The `errors` entry, if the DSL reported one.
    pub fn errors(&self) -> Option<&Value> {
        self.data.get(ERRORS_KEY)
    }

    pub fn is_error(&self) -> bool {
        self.errors().is_some()
    }

    /// Human-readable summary of the `errors` entry.
    pub fn error_message(&self) -> Option<String> {
        let errors = self.errors()?;
        let message = errors
            .get("query")
            .and_then(|q| q.get("header"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| errors.to_string());
        Some(message)
    }

    /// Top-level keys, in payload order.
    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// `(key, item count)` for every sequence-valued top-level key, in payload order.
    pub fn keys_and_count(&self) -> Vec<(String, usize)> {
        self.data
            .iter()
            .filter_map(|(k, v)| v.as_array().map(|items| (k.clone(), items.len())))
            .collect()
    }

    /// Number of items under a sequence-valued key.
    pub fn count(&self, key: &str) -> Option<usize> {
        self.get(key).count()
    }

    /// Iterate the records under a sequence-valued key.
    ///
    /// Yields nothing when the key is absent or not a sequence.
    pub fn records<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a Value> + 'a {
        self.get(key).as_array().into_iter().flatten()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DslResult {
        DslResult::from_value(
            200,
            json!({
                "publications": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
                "_stats": {"total_count": 5},
                "researchers": [{"id": "r"}],
                "flag": false
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_key_and_attribute_access_agree() {
        let res = sample();
        let by_key = res.get("publications");
        let by_attr = res.attr("publications");
        assert_eq!(by_key, by_attr);
        assert_eq!(by_key.count(), Some(3));
    }

    #[test]
    fn test_missing_key_is_absent() {
        let res = sample();
        assert_eq!(res.get("missing_key"), Lookup::Absent);
        assert_eq!(res.attr("missing_key"), Lookup::Absent);
        assert!(res.get("missing_key").value().is_none());
    }

    #[test]
    fn test_false_value_is_not_absent() {
        let res = sample();
        assert_eq!(res.get("flag"), Lookup::Found(&json!(false)));
    }

    #[test]
    fn test_stats_attribute_reads_underscore_key() {
        let res = sample();
        assert_eq!(res.attr("stats"), Lookup::Found(&json!({"total_count": 5})));
        assert_eq!(res.stats(), res.get("_stats"));
        assert!(res.get("stats").is_absent());
        assert_eq!(res.total_count(), Some(5));
    }

    #[test]
    fn test_keys_in_payload_order() {
        let res = sample();
        assert_eq!(
            res.keys(),
            vec!["publications", "_stats", "researchers", "flag"]
        );
    }

    #[test]
    fn test_keys_and_count_only_sequences() {
        let res = sample();
        assert_eq!(
            res.keys_and_count(),
            vec![
                ("publications".to_string(), 3),
                ("researchers".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_records_iterates_sequence() {
        let res = sample();
        let ids: Vec<&str> = res
            .records("publications")
            .filter_map(|r| r["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(res.records("nothing").count(), 0);
        assert_eq!(res.records("_stats").count(), 0);
    }

    #[test]
    fn test_error_payload() {
        let res = DslResult::from_body(
            400,
            r#"{"errors": {"query": {"header": "Semantic errors found", "details": []}}}"#,
        )
        .unwrap();
        assert_eq!(res.status(), 400);
        assert!(res.is_error());
        assert_eq!(res.error_message().as_deref(), Some("Semantic errors found"));
        assert!(!sample().is_error());
    }

    #[test]
    fn test_non_object_body_rejected() {
        assert!(DslResult::from_body(200, "[1, 2]").is_err());
        assert!(matches!(
            DslResult::from_body(200, "not json"),
            Err(DslError::Json(_))
        ));
    }
}
