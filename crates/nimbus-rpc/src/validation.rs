//! Input validation helpers for tool arguments.

use nimbus_core::tools::ToolParameterSchema;
use serde_json::{Map, Value};

use crate::errors::RpcError;

/// Maximum length of a string argument (8 KB).
pub const MAX_ARGUMENT_LENGTH: usize = 8_192;

/// Validate that a string parameter does not exceed `max_len` bytes.
pub fn validate_string_param(value: &str, name: &str, max_len: usize) -> Result<(), RpcError> {
    if value.len() > max_len {
        return Err(RpcError::Validation(format!(
            "Argument '{name}' exceeds maximum length ({} > {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Check `arguments` against a tool's declared schema.
///
/// Every required property must be present and non-null, and every argument
/// whose property declares a `type` must match it. Undeclared arguments are
/// accepted as-is.
pub fn validate_arguments(
    schema: &ToolParameterSchema,
    arguments: &Map<String, Value>,
) -> Result<(), RpcError> {
    for name in schema.required.iter().flatten() {
        if arguments.get(name).is_none_or(Value::is_null) {
            return Err(RpcError::Validation(format!(
                "Missing required argument: {name}"
            )));
        }
    }

    for (name, value) in arguments {
        let Some(expected) = schema.property_type(name) else {
            continue;
        };
        if !matches_type(value, expected) {
            return Err(RpcError::Validation(format!(
                "Argument '{name}' must be of type {expected}"
            )));
        }
        if let Value::String(s) = value {
            validate_string_param(s, name, MAX_ARGUMENT_LENGTH)?;
        }
    }
    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}
