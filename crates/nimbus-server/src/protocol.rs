//! Protocol server: binds transports to the request dispatcher.
//!
//! Every connected transport gets a [`DispatchHandler`] as its single inbound
//! subscriber. The handler decodes the payload, dispatches it, and sends the
//! response back over the same transport.

use std::sync::Arc;

use async_trait::async_trait;
use nimbus_rpc::{HandlerRegistry, RpcContext};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{RegistryError, TransportError};
use crate::registry::{ConnectionRegistry, Session};
use crate::transport::{InboundHandler, Transport};

/// Routes one transport's inbound payloads through the dispatcher.
struct DispatchHandler {
    handlers: Arc<HandlerRegistry>,
    ctx: RpcContext,
}

#[async_trait]
impl InboundHandler for DispatchHandler {
    async fn handle(
        &self,
        payload: Value,
        transport: Arc<dyn Transport>,
    ) -> Result<(), TransportError> {
        let response = self.handlers.dispatch_value(payload, &self.ctx).await;
        transport.send(&response).await
    }
}

/// Owns the dispatcher and the connection registry.
#[derive(Clone)]
pub struct ProtocolServer {
    handlers: Arc<HandlerRegistry>,
    ctx: RpcContext,
    connections: ConnectionRegistry,
}

impl std::fmt::Debug for ProtocolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolServer")
            .field("types", &self.handlers.types())
            .field("connections", &self.connections)
            .finish_non_exhaustive()
    }
}

impl ProtocolServer {
    /// Create a server over `handlers` with a fresh registry.
    pub fn new(handlers: Arc<HandlerRegistry>, ctx: RpcContext) -> Self {
        Self {
            handlers,
            ctx,
            connections: ConnectionRegistry::new(),
        }
    }

    /// Register `transport` and subscribe the dispatcher to it.
    pub fn connect(
        &self,
        transport: Arc<dyn Transport>,
        client_id: Option<String>,
    ) -> Result<Arc<Session>, RegistryError> {
        let session = self.connections.register(transport.clone(), client_id)?;
        let handler = Arc::new(DispatchHandler {
            handlers: self.handlers.clone(),
            ctx: self.ctx.clone(),
        });
        if transport.on_message(handler).is_some() {
            debug!(session_id = %session.session_id, "replaced existing inbound handler");
        }
        Ok(session)
    }

    /// Close one session's transport. Returns whether it was live.
    pub fn disconnect(&self, session_id: &str) -> bool {
        match self.connections.lookup(session_id) {
            Some(transport) => {
                transport.close();
                true
            }
            None => false,
        }
    }

    /// Close every session authenticated as `client_id`.
    pub fn close_client(&self, client_id: &str) -> usize {
        let sessions = self.connections.sessions_for_client(client_id);
        for session in &sessions {
            session.transport.close();
        }
        if !sessions.is_empty() {
            info!(client_id, count = sessions.len(), "closed client sessions");
        }
        sessions.len()
    }

    /// Close every live session.
    pub fn close_all(&self) -> usize {
        let sessions = self.connections.sessions();
        for session in &sessions {
            session.transport.close();
        }
        sessions.len()
    }

    /// The connection registry.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// The dispatcher.
    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }
}
