//! Invocation contract between the HTTP layer and a handler instance.
//!
//! These types are serialized in camelCase and must stay stable across
//! reloads; every handler generation receives the same event shape.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request metadata recovered by routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub resource_path: String,
    pub http_method: String,
}

/// Normalized request passed to `proxy_router`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    pub request_context: RequestContext,
    pub headers: BTreeMap<String, String>,
    /// A key given once maps to a string, a repeated key to an array.
    pub query_string_parameters: BTreeMap<String, Value>,
    pub body: Value,
    pub path_parameters: HashMap<String, String>,
}

/// Successful handler result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl InvocationResponse {
    pub const DEFAULT_STATUS: u16 = 200;

    /// Status to send; a missing or zero status becomes 200.
    pub fn status_code(&self) -> u16 {
        match self.status_code {
            None | Some(0) => Self::DEFAULT_STATUS,
            Some(code) => code,
        }
    }

    /// Body to send; a missing or falsy body (`null`, `false`, `0`, `""`)
    /// becomes `{}`.
    pub fn body(&self) -> Value {
        match &self.body {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Value::Object(Map::new()),
            Some(Value::String(s)) if s.is_empty() => Value::Object(Map::new()),
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Value::Object(Map::new()),
            Some(body) => body.clone(),
        }
    }
}

/// Failure signalled by a handler for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What a handler module writes back: `{"result": {...}}` or `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandlerOutcome {
    Result(InvocationResponse),
    Error(HandlerError),
}

impl From<HandlerOutcome> for Result<InvocationResponse, HandlerError> {
    fn from(outcome: HandlerOutcome) -> Self {
        match outcome {
            HandlerOutcome::Result(response) => Ok(response),
            HandlerOutcome::Error(error) => Err(error),
        }
    }
}

/// The handler's declared configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Route template → verb → opaque metadata, in declaration order.
    #[serde(default)]
    pub routes: Option<Map<String, Value>>,
}
