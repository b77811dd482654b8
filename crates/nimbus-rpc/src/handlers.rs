//! Built-in request handlers.

use async_trait::async_trait;
use nimbus_core::tools::error_result;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::{HandlerRegistry, RequestHandler};
use crate::types::RpcRequest;
use crate::validation::validate_arguments;

/// Request types bound to [`ListToolsHandler`].
pub const LIST_TOOLS_TYPES: [&str; 2] = ["ListTools", "ListToolsRequest"];
/// Request types bound to [`CallToolHandler`].
pub const CALL_TOOL_TYPES: [&str; 2] = ["CallTool", "CallToolRequest"];

/// Register every built-in handler.
pub fn register_builtins(registry: &mut HandlerRegistry) {
    for ty in LIST_TOOLS_TYPES {
        registry.register(ty, ListToolsHandler);
    }
    for ty in CALL_TOOL_TYPES {
        registry.register(ty, CallToolHandler);
    }
}

/// Returns the tool catalog. No side effects.
pub struct ListToolsHandler;

#[async_trait]
impl RequestHandler for ListToolsHandler {
    async fn handle(&self, _request: &RpcRequest, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({ "tools": ctx.tools.definitions() }))
    }
}

/// Validates and runs one tool.
pub struct CallToolHandler;

#[async_trait]
impl RequestHandler for CallToolHandler {
    async fn handle(&self, request: &RpcRequest, ctx: &RpcContext) -> Result<Value, RpcError> {
        let params = request
            .params
            .as_ref()
            .ok_or_else(|| RpcError::Validation("Missing required field: params".into()))?;

        let tool = ctx
            .tools
            .get(&params.name)
            .ok_or_else(|| RpcError::UnknownTool(params.name.clone()))?;

        validate_arguments(&tool.definition().input_schema, &params.arguments)?;

        let result = match tool.execute(&params.arguments).await {
            Ok(result) => result,
            Err(RpcError::Upstream(message)) => {
                warn!(tool = %params.name, %message, "tool failed upstream");
                error_result(message)
            }
            Err(e) => return Err(e),
        };
        debug!(tool = %params.name, is_error = result.is_error(), "tool executed");

        Ok(serde_json::to_value(result)?)
    }
}
