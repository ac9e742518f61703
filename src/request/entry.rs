//! Serializable form of a request descriptor, used for request list files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Body, Method, Request};

/// JSON representation of a request.
///
/// ```json
/// {"method": "POST", "url": "https://example.com/api", "body": {"id": 1}, "file_name": "1.json"}
/// ```
///
/// A string `body` is sent as text; any other JSON value is sent as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestEntry {
    #[serde(default)]
    pub method: Method,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl RequestEntry {
    /// Parses a JSON array of entries.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the input is not a valid entry list.
    pub fn parse_list(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<RequestEntry> for Request {
    fn from(entry: RequestEntry) -> Self {
        let mut request = Request::new(entry.method, entry.url);
        for (name, value) in entry.params {
            request = request.with_param(name, value);
        }
        for (name, value) in entry.headers {
            request = request.with_header(name, value);
        }
        match entry.body {
            Some(Value::String(text)) => request = request.with_body(Body::Text(text)),
            Some(Value::Null) | None => {}
            Some(value) => request = request.with_body(Body::Json(value)),
        }
        if let Some(ms) = entry.timeout_ms {
            request = request.with_timeout(Duration::from_millis(ms));
        }
        for (key, value) in entry.extra {
            request = request.with_extra(key, value);
        }
        if let Some(file_name) = entry.file_name {
            request = request.save_as(file_name);
        }
        request
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_entry_defaults_to_get() {
        let entries = RequestEntry::parse_list(r#"[{"url": "https://example.com"}]"#).unwrap();
        let request = Request::from(entries[0].clone());
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.url(), "https://example.com");
        assert!(request.body().is_none());
        assert!(request.file_name().is_none());
    }

    #[test]
    fn test_full_entry_converts_every_field() {
        let json = r#"[{
            "method": "POST",
            "url": "https://example.com/api",
            "params": {"q": "rust"},
            "headers": {"Accept": "application/json"},
            "body": {"id": 7},
            "file_name": "seven.json",
            "timeout_ms": 1500,
            "extra": {"tag": "x"}
        }]"#;
        let entries = RequestEntry::parse_list(json).unwrap();
        let request = Request::from(entries.into_iter().next().unwrap());

        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.params(), &[("q".to_string(), "rust".to_string())]);
        assert_eq!(
            request.headers(),
            &[("Accept".to_string(), "application/json".to_string())]
        );
        assert_eq!(request.body(), Some(&Body::Json(serde_json::json!({"id": 7}))));
        assert_eq!(request.file_name(), Some("seven.json"));
        assert_eq!(request.request_options().timeout, Some(Duration::from_millis(1500)));
        assert_eq!(
            request.request_options().extra.get("tag"),
            Some(&Value::String("x".into()))
        );
    }

    #[test]
    fn test_string_body_becomes_text() {
        let entries =
            RequestEntry::parse_list(r#"[{"url": "https://e.com", "body": "plain"}]"#).unwrap();
        let request = Request::from(entries[0].clone());
        assert_eq!(request.body(), Some(&Body::Text("plain".into())));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = RequestEntry::parse_list(r#"[{"url": "https://e.com", "verb": "GET"}]"#);
        assert!(result.is_err());
    }
}
