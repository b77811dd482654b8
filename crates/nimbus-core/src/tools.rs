//! Tool definition and result types.
//!
//! Defines the schema advertised for each tool in the catalog, plus the
//! content shape returned by tool execution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Tool schema
// ─────────────────────────────────────────────────────────────────────────────

/// JSON Schema-compatible parameter definition for a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolParameterSchema {
    /// Top-level JSON Schema type.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property definitions (when type is `object`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    /// Required property names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Catch-all for additional JSON Schema properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolParameterSchema {
    /// Build an `object` schema from `(name, type, description)` property
    /// triples and a list of required names.
    #[must_use]
    pub fn object(properties: &[(&str, &str, &str)], required: &[&str]) -> Self {
        let mut props = Map::new();
        for (name, ty, description) in properties {
            let _ = props.insert(
                (*name).to_owned(),
                serde_json::json!({ "type": ty, "description": description }),
            );
        }
        Self {
            schema_type: "object".into(),
            properties: Some(props),
            required: Some(required.iter().map(|s| (*s).to_owned()).collect()),
            extra: Map::new(),
        }
    }

    /// Declared JSON type of a property, if the schema names one.
    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.properties
            .as_ref()?
            .get(name)?
            .get("type")
            .and_then(Value::as_str)
    }
}

/// A tool as advertised by the `ListTools` catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub input_schema: ToolParameterSchema,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool result
// ─────────────────────────────────────────────────────────────────────────────

/// One content entry of a tool result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolContent {
    /// Content kind (always `"text"` for the built-in tools).
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text payload.
    pub text: String,
}

impl ToolContent {
    /// Create a text content entry.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".into(),
            text: text.into(),
        }
    }
}

/// Result of a tool execution.
///
/// A failed tool still produces a result: `is_error` marks the content as a
/// tool-level error the caller can reason about, as opposed to a protocol
/// failure of the request itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Ordered content entries.
    pub content: Vec<ToolContent>,
    /// Whether the execution resulted in an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    /// Whether this result is marked as a tool-level error.
    pub fn is_error(&self) -> bool {
        self.is_error == Some(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Factory helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Create a single-entry text result.
#[must_use]
pub fn text_result(text: impl Into<String>) -> ToolCallResult {
    ToolCallResult {
        content: vec![ToolContent::text(text)],
        is_error: None,
    }
}

/// Create an error result. The message is prefixed with `Error: `.
#[must_use]
pub fn error_result(message: impl AsRef<str>) -> ToolCallResult {
    ToolCallResult {
        content: vec![ToolContent::text(format!("Error: {}", message.as_ref()))],
        is_error: Some(true),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
