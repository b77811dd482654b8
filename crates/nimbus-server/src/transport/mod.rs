//! Transport abstraction over a bidirectional message channel.
//!
//! A transport delivers responses to one remote peer, hands inbound payloads
//! to a single registered [`InboundHandler`], and can be closed exactly once.
//! Closing runs every hook registered through [`Transport::on_close`]; the
//! connection registry uses that to drop the session.

pub mod push_stream;
pub mod socket;

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use nimbus_core::ids::SessionId;
use nimbus_rpc::RpcResponse;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::errors::TransportError;

pub use push_stream::{PushStreamTransport, StreamFrame};
pub use socket::SocketTransport;

/// Callback run once when a transport closes.
pub type CloseHook = Box<dyn FnOnce(&SessionId) + Send + 'static>;

/// Concrete transport family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportKind {
    /// Server-push event stream plus out-of-band delivery calls.
    PushStream,
    /// Full-duplex socket.
    Socket,
}

impl TransportKind {
    /// Stable lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PushStream => "push_stream",
            Self::Socket => "socket",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives inbound payloads from a transport.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Handle one payload. Any reply goes out through `transport`.
    async fn handle(&self, payload: Value, transport: Arc<dyn Transport>)
    -> Result<(), TransportError>;
}

/// A bidirectional message channel to one peer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Session id this transport is registered under.
    fn session_id(&self) -> &SessionId;

    /// Transport family.
    fn kind(&self) -> TransportKind;

    /// Deliver one response to the peer. Failures are reported, not retried.
    async fn send(&self, response: &RpcResponse) -> Result<(), TransportError>;

    /// Install the inbound handler, returning the one it replaces.
    ///
    /// There is at most one subscriber; replacing it is the only way to
    /// change where inbound messages go.
    fn on_message(&self, handler: Arc<dyn InboundHandler>) -> Option<Arc<dyn InboundHandler>>;

    /// Run `hook` when the transport closes, or immediately if it already has.
    fn on_close(&self, hook: CloseHook);

    /// Release the medium. Idempotent.
    fn close(&self);

    /// Whether [`close`](Transport::close) has run.
    fn is_closed(&self) -> bool;

    /// Upcast for recovering the concrete transport.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// State shared by every transport implementation: the handler slot, the
/// close hooks, and the closed flag.
pub(crate) struct TransportCore {
    session_id: SessionId,
    handler: Mutex<Option<Arc<dyn InboundHandler>>>,
    close_hooks: Mutex<Vec<CloseHook>>,
    closed: AtomicBool,
}

impl TransportCore {
    pub(crate) fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            handler: Mutex::new(None),
            close_hooks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub(crate) fn replace_handler(
        &self,
        handler: Arc<dyn InboundHandler>,
    ) -> Option<Arc<dyn InboundHandler>> {
        self.handler.lock().replace(handler)
    }

    pub(crate) fn handler(&self) -> Option<Arc<dyn InboundHandler>> {
        self.handler.lock().clone()
    }

    pub(crate) fn add_close_hook(&self, hook: CloseHook) {
        let mut hooks = self.close_hooks.lock();
        if self.closed.load(Ordering::Acquire) {
            drop(hooks);
            hook(&self.session_id);
        } else {
            hooks.push(hook);
        }
    }

    /// Flip to closed and run the hooks. Returns `false` if already closed.
    pub(crate) fn mark_closed(&self) -> bool {
        let hooks = {
            let mut hooks = self.close_hooks.lock();
            if self.closed.swap(true, Ordering::AcqRel) {
                return false;
            }
            std::mem::take(&mut *hooks)
        };
        for hook in hooks {
            hook(&self.session_id);
        }
        let _ = self.handler.lock().take();
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Hand `payload` to the transport's registered handler.
pub(crate) async fn deliver(
    core: &TransportCore,
    transport: Arc<dyn Transport>,
    payload: Value,
) -> Result<(), TransportError> {
    if core.is_closed() {
        return Err(TransportError::Closed);
    }
    let handler = core.handler().ok_or(TransportError::HandlerNotReady)?;
    handler.handle(payload, transport).await
}
