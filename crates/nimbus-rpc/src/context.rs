//! RPC dependency-injection context.

use std::sync::Arc;

use crate::catalog::ToolCatalog;

/// Shared context passed to every request handler.
#[derive(Clone, Debug)]
pub struct RpcContext {
    /// Tools available to `ListTools` / `CallTool`.
    pub tools: Arc<ToolCatalog>,
}

impl RpcContext {
    /// Create a context over `tools`.
    pub fn new(tools: Arc<ToolCatalog>) -> Self {
        Self { tools }
    }
}
