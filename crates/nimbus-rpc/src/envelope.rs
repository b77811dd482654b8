//! Validated decode of inbound payloads.
//!
//! Payloads arrive as untrusted JSON. Each field of the envelope is checked
//! before a [`RpcRequest`] exists, so handlers never see a half-formed
//! request. When decoding fails the caller still gets the best correlation
//! id that could be recovered, to answer with `{id, error}`.

use serde_json::{Map, Value};

use crate::errors::RpcError;
use crate::types::{RpcRequest, RpcResponse, ToolCallParams};

/// Correlation id used when the payload carries none.
pub const UNKNOWN_ID: &str = "unknown";

/// A payload that could not be decoded into a request.
#[derive(Debug)]
pub struct DecodeError {
    /// Recovered correlation id, or [`UNKNOWN_ID`].
    pub id: String,
    /// Why decoding failed.
    pub error: RpcError,
}

impl DecodeError {
    fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: RpcError::Validation(message.into()),
        }
    }

    /// Render as an error frame.
    pub fn into_response(self) -> RpcResponse {
        RpcResponse::error(self.id, self.error.to_string())
    }
}

/// Parse a raw text frame into JSON. No envelope fields are checked yet;
/// that happens in [`decode_value`] once the frame reaches the dispatcher.
pub fn parse_frame(text: &str) -> Result<Value, DecodeError> {
    serde_json::from_str(text)
        .map_err(|e| DecodeError::new(UNKNOWN_ID, format!("Invalid JSON: {e}")))
}

/// Decode an already-parsed JSON payload.
pub fn decode_value(value: Value) -> Result<RpcRequest, DecodeError> {
    let Value::Object(mut obj) = value else {
        return Err(DecodeError::new(UNKNOWN_ID, "Request must be a JSON object"));
    };

    let id = match obj.remove("id") {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => {
            return Err(DecodeError::new(n.to_string(), "Field 'id' must be a string"));
        }
        _ => return Err(DecodeError::new(UNKNOWN_ID, "Missing required field: id")),
    };

    let request_type = match obj.remove("type") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => return Err(DecodeError::new(id, "Missing required field: type")),
    };

    let params = match obj.remove("params") {
        None | Some(Value::Null) => None,
        Some(Value::Object(p)) if p.is_empty() => None,
        Some(Value::Object(p)) => Some(decode_params(p).map_err(|msg| DecodeError::new(&id, msg))?),
        Some(_) => return Err(DecodeError::new(id, "Field 'params' must be an object")),
    };

    Ok(RpcRequest {
        id,
        request_type,
        params,
    })
}

fn decode_params(mut params: Map<String, Value>) -> Result<ToolCallParams, String> {
    let name = match params.remove("name") {
        Some(Value::String(s)) => s,
        Some(_) => return Err("Field 'params.name' must be a string".into()),
        None => return Err("Missing required field: params.name".into()),
    };
    let arguments = match params.remove("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(a)) => a,
        Some(_) => return Err("Field 'params.arguments' must be an object".into()),
    };
    Ok(ToolCallParams { name, arguments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn decodes_call_tool() {
        let req = decode_value(json!({
            "id": "1",
            "type": "CallTool",
            "params": { "name": "get_weather", "arguments": { "city": "London" } }
        }))
        .unwrap();
        assert_eq!(req.id, "1");
        assert_eq!(req.request_type, "CallTool");
        let params = req.params.unwrap();
        assert_eq!(params.name, "get_weather");
        assert_eq!(params.arguments["city"], "London");
    }

    #[test]
    fn empty_or_null_params_become_none() {
        let req = decode_value(json!({"id": "1", "type": "ListTools", "params": {}})).unwrap();
        assert!(req.params.is_none());
        let req = decode_value(json!({"id": "1", "type": "ListTools", "params": null})).unwrap();
        assert!(req.params.is_none());
    }

    #[test]
    fn missing_arguments_default_to_empty() {
        let req = decode_value(json!({"id": "1", "type": "CallTool", "params": {"name": "t"}}))
            .unwrap();
        assert!(req.params.unwrap().arguments.is_empty());
    }

    #[test]
    fn invalid_json_uses_unknown_id() {
        let err = parse_frame("{not json").unwrap_err();
        assert_eq!(err.id, UNKNOWN_ID);
        assert_matches!(err.error, RpcError::Validation(msg) if msg.starts_with("Invalid JSON"));
    }

    #[test]
    fn non_object_uses_unknown_id() {
        let err = decode_value(json!([1, 2])).unwrap_err();
        assert_eq!(err.id, UNKNOWN_ID);
    }

    #[test]
    fn missing_id_uses_unknown_id() {
        let err = decode_value(json!({"type": "ListTools"})).unwrap_err();
        assert_eq!(err.id, UNKNOWN_ID);
        assert_eq!(err.error.to_string(), "Missing required field: id");
    }

    #[test]
    fn numeric_id_is_recovered_but_rejected() {
        let err = decode_value(json!({"id": 7, "type": "ListTools"})).unwrap_err();
        assert_eq!(err.id, "7");
    }

    #[test]
    fn missing_type_keeps_id() {
        let err = decode_value(json!({"id": "abc"})).unwrap_err();
        assert_eq!(err.id, "abc");
        assert_eq!(err.error.to_string(), "Missing required field: type");
    }

    #[test]
    fn bad_params_keep_id() {
        let err = decode_value(json!({"id": "p", "type": "CallTool", "params": "x"})).unwrap_err();
        assert_eq!(err.id, "p");

        let err = decode_value(json!({"id": "q", "type": "CallTool", "params": {"name": 3}}))
            .unwrap_err();
        assert_eq!(err.id, "q");
        assert_eq!(err.error.to_string(), "Field 'params.name' must be a string");

        let err = decode_value(json!({
            "id": "r", "type": "CallTool", "params": {"name": "t", "arguments": [1]}
        }))
        .unwrap_err();
        assert_eq!(err.error.to_string(), "Field 'params.arguments' must be an object");
    }

    #[test]
    fn into_response_is_error_frame() {
        let resp = decode_value(json!({"id": "z"})).unwrap_err().into_response();
        assert_eq!(resp.id, "z");
        assert!(resp.is_error());
    }
}
