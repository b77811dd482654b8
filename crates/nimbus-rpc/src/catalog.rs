//! Tool catalog and the built-in `get_weather` tool.

use std::sync::Arc;

use async_trait::async_trait;
use nimbus_core::tools::{ToolCallResult, ToolDefinition, ToolParameterSchema, text_result};
use nimbus_weather::WeatherLookup;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::RpcError;

/// A named, schema-described unit of server-side functionality.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Definition advertised by `ListTools`.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool on already-validated arguments.
    ///
    /// Return [`RpcError::Upstream`] for failures the caller should see as
    /// tool output rather than as a protocol error.
    async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolCallResult, RpcError>;
}

/// Ordered, immutable set of tools.
#[derive(Default)]
pub struct ToolCatalog {
    tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolCatalog {
    /// Build a catalog from tools. A later tool shadows an earlier one with
    /// the same name.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut catalog = Self::default();
        for tool in tools {
            catalog.insert(tool);
        }
        catalog
    }

    /// The standard catalog: `get_weather` backed by `lookup`.
    pub fn weather(lookup: Arc<dyn WeatherLookup>) -> Self {
        Self::new(vec![Arc::new(WeatherTool::new(lookup))])
    }

    fn insert(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.retain(|t| t.definition().name != name);
        self.tools.push(tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.definition().name == name)
            .cloned()
    }

    /// Definitions of every tool, in catalog order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Tool names, in catalog order.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// get_weather
// ─────────────────────────────────────────────────────────────────────────────

/// Name of the weather tool.
pub const WEATHER_TOOL_NAME: &str = "get_weather";

/// Current weather for a city, via a [`WeatherLookup`].
pub struct WeatherTool {
    lookup: Arc<dyn WeatherLookup>,
}

impl WeatherTool {
    /// Create the tool over `lookup`.
    pub fn new(lookup: Arc<dyn WeatherLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: WEATHER_TOOL_NAME.into(),
            description: "Get current weather for a city".into(),
            input_schema: ToolParameterSchema::object(
                &[("city", "string", "City name")],
                &["city"],
            ),
        }
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolCallResult, RpcError> {
        let city = arguments
            .get("city")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::Validation("Missing required argument: city".into()))?;

        let record = self
            .lookup
            .lookup(city)
            .await
            .map_err(|e| RpcError::Upstream(e.to_string()))?;
        debug!(city = %record.city, "weather lookup succeeded");

        Ok(text_result(serde_json::to_string_pretty(&record)?))
    }
}
