//! Inbound adaptation: HTTP request → invocation event.
//!
//! # Responsibilities
//! - Copy headers and query parameters into flat string maps
//! - Deserialize the body according to its content type
//! - Combine them with the routing match into an `InvocationEvent`
//!
//! # Design Decisions
//! - Header names arrive lowercased from the HTTP stack; repeated headers are
//!   joined with ", "
//! - A repeated query key becomes an array of its values, in order
//! - An empty or unrecognized body becomes `{}`; only malformed JSON is an
//!   error

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::handler::{InvocationEvent, RequestContext};
use crate::routing::MatchResult;

/// A request body the adapter refuses to pass on.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl BodyError {
    pub fn status(&self) -> StatusCode {
        match self {
            BodyError::InvalidJson(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Build the event handed to `proxy_router`.
pub fn build_event(method: &Method, headers: &HeaderMap, uri: &Uri, body: Value, matched: MatchResult) -> InvocationEvent {
    InvocationEvent {
        request_context: RequestContext {
            resource_path: matched.resource_path,
            http_method: method.as_str().to_string(),
        },
        headers: collect_headers(headers),
        query_string_parameters: collect_query(uri),
        body,
        path_parameters: matched.path_parameters,
    }
}

/// Flatten request headers into a name → value map.
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    collected
}

/// Decode the query string into a name → value map.
pub fn collect_query(uri: &Uri) -> BTreeMap<String, Value> {
    let mut collected: BTreeMap<String, Value> = BTreeMap::new();
    let Some(query) = uri.query() else {
        return collected;
    };

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()).into_owned() {
        match collected.get_mut(&key) {
            None => {
                collected.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    collected
}

/// Deserialize a request body by content type.
pub fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> Result<Value, BodyError> {
    if bytes.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        Ok(serde_json::from_slice(bytes)?)
    } else if mime == "application/x-www-form-urlencoded" {
        let form = url::form_urlencoded::parse(bytes)
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<String, Value>>();
        Ok(Value::Object(form))
    } else if mime.starts_with("text/") {
        Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
    } else {
        Ok(Value::Object(Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;
    use std::collections::HashMap;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_json_body() {
        let body = parse_body(&headers("application/json; charset=utf-8"), br#"{"a":[1,2]}"#).unwrap();
        assert_eq!(body, json!({ "a": [1, 2] }));
    }

    #[test]
    fn test_invalid_json_body() {
        let err = parse_body(&headers("application/json"), b"{nope").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_form_body() {
        let body = parse_body(&headers("application/x-www-form-urlencoded"), b"name=Ada+L&x=1&x=2").unwrap();
        assert_eq!(body, json!({ "name": "Ada L", "x": "2" }));
    }

    #[test]
    fn test_text_body() {
        let body = parse_body(&headers("text/plain"), b"hello").unwrap();
        assert_eq!(body, json!("hello"));
    }

    #[test]
    fn test_empty_and_unknown_bodies() {
        assert_eq!(parse_body(&HeaderMap::new(), b"").unwrap(), json!({}));
        assert_eq!(parse_body(&headers("application/octet-stream"), b"\x00\x01").unwrap(), json!({}));
    }

    #[test]
    fn test_repeated_headers_joined() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        headers.insert("host", HeaderValue::from_static("localhost:3000"));

        let collected = collect_headers(&headers);
        assert_eq!(collected["x-tag"], "a, b");
        assert_eq!(collected["host"], "localhost:3000");
    }

    #[test]
    fn test_query_parameters() {
        let uri: Uri = "/items/42?sort=desc&q=a%20b&sort=asc&sort=name".parse().unwrap();
        let query = collect_query(&uri);
        assert_eq!(query["sort"], json!(["desc", "asc", "name"]));
        assert_eq!(query["q"], "a b");

        let uri: Uri = "/items/42".parse().unwrap();
        assert!(collect_query(&uri).is_empty());
    }

    #[test]
    fn test_build_event() {
        let uri: Uri = "/items/42?verbose=1".parse().unwrap();
        let matched = MatchResult {
            resource_path: "/items/{id}".into(),
            path_parameters: HashMap::from([("id".to_string(), "42".to_string())]),
        };

        let event = build_event(&Method::GET, &HeaderMap::new(), &uri, json!({}), matched);
        assert_eq!(event.request_context.resource_path, "/items/{id}");
        assert_eq!(event.request_context.http_method, "GET");
        assert_eq!(event.query_string_parameters["verbose"], "1");
        assert_eq!(event.path_parameters["id"], "42");
    }
}
