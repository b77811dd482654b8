//! Handler registry and async dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::context::RpcContext;
use crate::envelope::decode_value;
use crate::errors::RpcError;
use crate::handlers::register_builtins;
use crate::types::{RpcRequest, RpcResponse};

/// Trait implemented by every request handler.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Execute the handler for `request`.
    async fn handle(&self, request: &RpcRequest, ctx: &RpcContext) -> Result<Value, RpcError>;
}

/// Registry mapping request types to handlers.
///
/// Populated at startup and read-only afterwards. No timeout is applied to
/// handlers here; the lookup collaborator enforces its own.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn RequestHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.types())
            .finish()
    }
}

impl HandlerRegistry {
    /// Requests slower than this are logged.
    const SLOW_REQUEST: Duration = Duration::from_secs(5);

    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with `ListTools` / `CallTool` (and their long aliases) bound.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Bind a request type to a handler. The last registration wins.
    pub fn register(&mut self, request_type: &str, handler: impl RequestHandler + 'static) {
        let _ = self
            .handlers
            .insert(request_type.to_owned(), Arc::new(handler));
    }

    /// Dispatch a decoded request. Always yields exactly one response
    /// carrying the request's id.
    #[instrument(skip_all, fields(request_id = %request.id, request_type = %request.request_type))]
    pub async fn dispatch(&self, request: &RpcRequest, ctx: &RpcContext) -> RpcResponse {
        let Some(handler) = self.handlers.get(&request.request_type) else {
            let err = RpcError::UnknownRequestType(request.request_type.clone());
            debug!(code = err.code(), "no handler for request type");
            return RpcResponse::error(&request.id, err.to_string());
        };

        let start = Instant::now();
        let response = match handler.handle(request, ctx).await {
            Ok(result) => RpcResponse::success(&request.id, result),
            Err(err) => {
                debug!(code = err.code(), error = %err, "handler returned error");
                RpcResponse::error(&request.id, err.to_string())
            }
        };

        let duration = start.elapsed();
        if duration >= Self::SLOW_REQUEST {
            warn!(duration_secs = duration.as_secs_f64(), "slow request");
        }
        response
    }

    /// Decode an untrusted payload and dispatch it.
    ///
    /// Envelope failures are answered with `{id, error}` using the best id
    /// that could be recovered.
    pub async fn dispatch_value(&self, payload: Value, ctx: &RpcContext) -> RpcResponse {
        match decode_value(payload) {
            Ok(request) => self.dispatch(&request, ctx).await,
            Err(err) => {
                debug!(request_id = %err.id, error = %err.error, "rejected malformed request");
                err.into_response()
            }
        }
    }

    /// All registered request types (sorted).
    pub fn types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ToolCatalog;
    use serde_json::json;

    fn ctx() -> RpcContext {
        RpcContext::new(Arc::new(ToolCatalog::default()))
    }

    // ── Test handler implementations ────────────────────────────────

    struct EchoHandler;

    #[async_trait]
    impl RequestHandler for EchoHandler {
        async fn handle(&self, request: &RpcRequest, _ctx: &RpcContext) -> Result<Value, RpcError> {
            Ok(json!({ "echo": request.request_type }))
        }
    }

    struct FailHandler;

    #[async_trait]
    impl RequestHandler for FailHandler {
        async fn handle(&self, _request: &RpcRequest, _ctx: &RpcContext) -> Result<Value, RpcError> {
            Err(RpcError::Internal("boom".into()))
        }
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn register_and_dispatch_success() {
        let mut reg = HandlerRegistry::new();
        reg.register("Echo", EchoHandler);

        let resp = reg.dispatch(&RpcRequest::new("r1", "Echo"), &ctx()).await;
        assert_eq!(resp.id, "r1");
        assert!(!resp.is_error());
        assert_eq!(resp.result["echo"], "Echo");
    }

    #[tokio::test]
    async fn unknown_type_is_error_response() {
        let reg = HandlerRegistry::new();
        let resp = reg.dispatch(&RpcRequest::new("r2", "Nope"), &ctx()).await;
        assert_eq!(resp.id, "r2");
        assert_eq!(resp.error.as_deref(), Some("Unknown request type: Nope"));
    }

    #[tokio::test]
    async fn handler_error_is_error_response() {
        let mut reg = HandlerRegistry::new();
        reg.register("Fail", FailHandler);
        let resp = reg.dispatch(&RpcRequest::new("r3", "Fail"), &ctx()).await;
        assert_eq!(resp.id, "r3");
        assert_eq!(resp.error.as_deref(), Some("boom"));
        assert!(resp.result.is_empty());
    }

    #[tokio::test]
    async fn register_overwrites_previous() {
        let mut reg = HandlerRegistry::new();
        reg.register("T", EchoHandler);
        reg.register("T", FailHandler);
        let resp = reg.dispatch(&RpcRequest::new("r4", "T"), &ctx()).await;
        assert!(resp.is_error());
    }

    #[tokio::test]
    async fn dispatch_value_rejects_bad_envelope() {
        let reg = HandlerRegistry::with_builtins();
        let resp = reg.dispatch_value(json!({"type": "ListTools"}), &ctx()).await;
        assert_eq!(resp.id, "unknown");
        assert!(resp.is_error());

        let resp = reg.dispatch_value(json!("just a string"), &ctx()).await;
        assert_eq!(resp.id, "unknown");
    }

    #[tokio::test]
    async fn dispatch_value_routes_valid_envelope() {
        let reg = HandlerRegistry::with_builtins();
        let resp = reg
            .dispatch_value(json!({"id": "v1", "type": "ListTools"}), &ctx())
            .await;
        assert_eq!(resp.id, "v1");
        assert_eq!(resp.result["tools"], json!([]));
    }

    #[test]
    fn builtins_are_registered() {
        let reg = HandlerRegistry::with_builtins();
        assert_eq!(
            reg.types(),
            vec!["CallTool", "CallToolRequest", "ListTools", "ListToolsRequest"]
        );
    }

    #[test]
    fn default_registry_is_empty() {
        assert!(HandlerRegistry::default().types().is_empty());
    }
}
