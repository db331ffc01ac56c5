//! Response normalization.
//!
//! Node replies are loosely typed JSON whose keys may arrive in any case
//! (`Error`/`error`, `FileCount`/`fileCount`). [`SearchResponse::from_http`]
//! resolves them once into a canonical struct.

use serde_json::{Map, Value};

use crate::error::ClientError;

/// A decoded node reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    status: u16,
    error: Option<String>,
    result: Option<SearchResult>,
}

/// The `Result` object of a successful reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    file_count: u64,
    match_count: u64,
    files: Vec<Value>,
    raw: Map<String, Value>,
}

impl SearchResult {
    fn from_map(raw: Map<String, Value>) -> Self {
        let count = |key: &str| get_ci(&raw, key).and_then(Value::as_u64).unwrap_or(0);
        let file_count = count("FileCount");
        let match_count = count("MatchCount");
        let files = get_ci(&raw, "Files")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Self {
            file_count,
            match_count,
            files,
            raw,
        }
    }

    pub fn file_count(&self) -> u64 {
        self.file_count
    }

    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    /// Per-file match records in reply order.
    pub fn files(&self) -> std::slice::Iter<'_, Value> {
        self.files.iter()
    }

    /// Any other field of the result object, looked up case-insensitively.
    pub fn get(&self, key: &str) -> Option<&Value> {
        get_ci(&self.raw, key)
    }
}

impl SearchResponse {
    /// Decode a reply.
    ///
    /// A 2xx reply must carry a JSON object; anything else is a
    /// `Connection` error. A non-2xx reply always yields a failed response,
    /// with a synthetic `HTTP <status>` message when the body has no error
    /// of its own.
    pub fn from_http(status: u16, body: &str) -> Result<Self, ClientError> {
        let success = (200..300).contains(&status);

        let object = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(other) if success => {
                return Err(ClientError::connection(format!(
                    "failed to decode response: expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
            Err(e) if success => {
                return Err(ClientError::connection(format!(
                    "failed to decode response: {}",
                    e
                )))
            }
            _ => Map::new(),
        };

        let mut response = Self::from_object(object);
        response.status = status;

        if !success && response.error.is_none() {
            response.error = Some(format!("HTTP {}", status));
        }

        Ok(response)
    }

    /// Wrap an already decoded JSON object as a 200 reply.
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let error = take_ci(&mut object, "Error").and_then(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });

        let result = take_ci(&mut object, "Result").and_then(|v| match v {
            Value::Object(map) => Some(SearchResult::from_map(map)),
            _ => None,
        });

        Self {
            status: 200,
            error,
            result,
        }
    }

    /// HTTP status of the reply.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// True iff the reply carries no error. An `Error` key whose value is
    /// `null` counts as absent.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The `Result` object. Missing on an error-free reply means the node
    /// sent something malformed.
    pub fn result(&self) -> Result<&SearchResult, ClientError> {
        self.result.as_ref().ok_or_else(|| match self.error {
            Some(ref message) => {
                ClientError::malformed(format!("failed response has no result: {}", message))
            }
            None => ClientError::malformed("response has no Result field"),
        })
    }

    pub fn file_count(&self) -> Result<u64, ClientError> {
        self.result().map(SearchResult::file_count)
    }

    pub fn match_count(&self) -> Result<u64, ClientError> {
        self.result().map(SearchResult::match_count)
    }

    /// Iterate file records. Each call starts a new pass.
    pub fn files(&self) -> Result<std::slice::Iter<'_, Value>, ClientError> {
        self.result().map(SearchResult::files)
    }
}

fn find_key(map: &Map<String, Value>, key: &str) -> Option<String> {
    if map.contains_key(key) {
        return Some(key.to_string());
    }
    map.keys().find(|k| k.eq_ignore_ascii_case(key)).cloned()
}

fn get_ci<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    find_key(map, key).and_then(|k| map.get(&k))
}

fn take_ci(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    find_key(map, key).and_then(|k| map.remove(&k))
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
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_success_round_trip() {
        let body = r#"{"Result": {"FileCount": 3, "MatchCount": 7, "Files": [{"a":1},{"a":2}]}}"#;
        let response = SearchResponse::from_http(200, body).unwrap();

        assert!(response.is_success());
        assert!(!response.is_failure());
        assert_eq!(response.error_message(), None);
        assert_eq!(response.file_count().unwrap(), 3);
        assert_eq!(response.match_count().unwrap(), 7);

        let files: Vec<_> = response.files().unwrap().cloned().collect();
        assert_eq!(files, vec![json!({"a": 1}), json!({"a": 2})]);

        // Restartable
        assert_eq!(response.files().unwrap().count(), 2);
    }

    #[test]
    fn test_error_reply() {
        let response = SearchResponse::from_http(200, r#"{"Error": "bad query"}"#).unwrap();

        assert!(!response.is_success());
        assert!(response.is_failure());
        assert_eq!(response.error_message(), Some("bad query"));
    }

    #[test]
    fn test_error_key_case_is_irrelevant() {
        let upper = SearchResponse::from_http(200, r#"{"Error": "x"}"#).unwrap();
        let lower = SearchResponse::from_http(200, r#"{"error": "x"}"#).unwrap();

        assert_eq!(upper.error_message(), lower.error_message());
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_camel_case_counts() {
        let body = r#"{"result": {"fileCount": 1, "matchCount": 2, "files": []}}"#;
        let response = SearchResponse::from_http(200, body).unwrap();

        assert_eq!(response.file_count().unwrap(), 1);
        assert_eq!(response.match_count().unwrap(), 2);
        assert_eq!(response.files().unwrap().count(), 0);
    }

    #[test]
    fn test_missing_files_is_empty() {
        let response =
            SearchResponse::from_http(200, r#"{"Result": {"FileCount": 0, "MatchCount": 0}}"#)
                .unwrap();
        assert_eq!(response.files().unwrap().next(), None);
    }

    #[test]
    fn test_missing_result_is_malformed() {
        let response = SearchResponse::from_http(200, "{}").unwrap();

        assert!(response.is_success());
        assert!(matches!(
            response.file_count(),
            Err(ClientError::MalformedResponse(_))
        ));
        assert!(matches!(
            response.files(),
            Err(ClientError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_invalid_json_on_success_is_connection_error() {
        let err = SearchResponse::from_http(200, "<html>").unwrap_err();
        assert!(err.is_connection());
        assert!(err.to_string().contains("failed to decode response"));

        let err = SearchResponse::from_http(200, "[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_non_success_status() {
        let response = SearchResponse::from_http(500, "boom").unwrap();
        assert!(response.is_failure());
        assert_eq!(response.status(), 500);
        assert_eq!(response.error_message(), Some("HTTP 500"));

        let response = SearchResponse::from_http(400, r#"{"error": "parse error"}"#).unwrap();
        assert_eq!(response.error_message(), Some("parse error"));
    }

    #[test]
    fn test_null_error_is_success() {
        let body = r#"{"Error": null, "Result": {"FileCount": 0, "MatchCount": 0}}"#;
        let response = SearchResponse::from_http(200, body).unwrap();
        assert!(response.is_success());
        assert_eq!(response.error_message(), None);

        let response = SearchResponse::from_http(200, r#"{"error": null, "Result": {}}"#).unwrap();
        assert!(response.is_success());
        assert_eq!(response.file_count().unwrap(), 0);
    }

    #[test]
    fn test_extra_result_fields() {
        let body = r#"{"Result": {"FileCount": 0, "MatchCount": 0, "Stats": {"Duration": 5}}}"#;
        let response = SearchResponse::from_http(200, body).unwrap();
        let result = response.result().unwrap();
        assert_eq!(result.get("stats"), Some(&json!({"Duration": 5})));
    }
}
