//! Wire-format types shared by both transports.
//!
//! ```text
//! client -> server  { "id", "type", "params": { "name", "arguments" } }
//! server -> client  { "id", ...result }  |  { "id", "error" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Incoming request from a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Caller-chosen correlation id.
    pub id: String,
    /// Request type (e.g. `CallTool`).
    #[serde(rename = "type")]
    pub request_type: String,
    /// Tool invocation parameters, absent for `ListTools`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ToolCallParams>,
}

/// `params` of a `CallTool` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments, checked against the tool's schema.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl RpcRequest {
    /// Build a request with no params.
    pub fn new(id: impl Into<String>, request_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            request_type: request_type.into(),
            params: None,
        }
    }

    /// Build a `CallTool` request.
    pub fn call_tool(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            request_type: "CallTool".into(),
            params: Some(ToolCallParams {
                name: name.into(),
                arguments,
            }),
        }
    }
}

/// Outgoing response frame.
///
/// The handler's result object is spread next to `id`, so a success frame
/// looks like `{"id":"1","content":[...]}` and carries no `error` key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Echoed correlation id.
    pub id: String,
    /// Result fields (empty on error).
    #[serde(flatten)]
    pub result: Map<String, Value>,
    /// Error message (present only on protocol failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    /// Build a success response.
    ///
    /// Object results are spread onto the frame; any other value is wrapped
    /// under a `result` key. `id` and `error` keys in the result are dropped
    /// so they cannot shadow the frame's own.
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        let mut map = match result {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                let _ = map.insert("result".into(), other);
                map
            }
        };
        let _ = map.remove("id");
        let _ = map.remove("error");
        Self {
            id: id.into(),
            result: map,
            error: None,
        }
    }

    /// Build an error response.
    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: Map::new(),
            error: Some(message.into()),
        }
    }

    /// Whether this is a protocol failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
