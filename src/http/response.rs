//! Outbound adaptation: handler outcome → HTTP response.
//!
//! # Responsibilities
//! - Apply the handler's status code, headers and body
//! - Map handler failures to `{ "message": ... }` error responses
//!
//! # Design Decisions
//! - Missing or zero status → 200, missing or falsy body → `{}`
//! - String bodies go out as text/html, everything else as JSON, unless the
//!   handler set its own content-type
//! - Handler error → 500, dropped callback → 500, timeout → 504
//! - Invalid handler headers are skipped with a warning, not fatal

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::handler::{InvocationError, InvocationResponse};

const HTML_UTF8: &str = "text/html; charset=utf-8";
const JSON_UTF8: &str = "application/json; charset=utf-8";

/// JSON error response `{ "message": message }`.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

/// Convert the outcome of one invocation.
pub fn into_response(outcome: Result<InvocationResponse, InvocationError>) -> Response {
    match outcome {
        Ok(response) => success_response(response),
        Err(e @ InvocationError::TimedOut(_)) => error_response(StatusCode::GATEWAY_TIMEOUT, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Build the HTTP response for a successful invocation.
pub fn success_response(invocation: InvocationResponse) -> Response {
    let code = invocation.status_code();
    let Ok(status) = StatusCode::from_u16(code) else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("handler returned invalid status code {}", code),
        );
    };

    let (bytes, content_type) = match invocation.body() {
        Value::String(text) => (text.into_bytes(), HTML_UTF8),
        other => match serde_json::to_vec(&other) {
            Ok(bytes) => (bytes, JSON_UTF8),
            Err(e) => {
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("failed to encode response body: {}", e),
                )
            }
        },
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in invocation.headers.into_iter().flatten() {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            tracing::warn!(header = %name, "Skipping invalid response header name");
            continue;
        };
        for value in header_values(&value) {
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    headers.append(name.clone(), value);
                }
                Err(_) => tracing::warn!(header = %name, "Skipping invalid response header value"),
            }
        }
    }

    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    response
}

/// Header values as strings; arrays become repeated headers, null is dropped.
fn header_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(header_values).collect(),
        other => vec![other.to_string()],
    }
}
