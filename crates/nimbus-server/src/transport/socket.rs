//! Socket transport: one full-duplex `WebSocket` multiplexing any number of
//! requests and responses.
//!
//! Each inbound text frame is handled on its own task, so responses to
//! concurrent requests may leave in any order; the `id` is the only
//! correlation. A request still running when the socket drops finishes and
//! its reply is discarded.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::{SinkExt, StreamExt};
use nimbus_core::ids::SessionId;
use nimbus_rpc::{RpcResponse, parse_frame};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{CloseHook, InboundHandler, Transport, TransportCore, TransportKind, deliver};
use crate::errors::TransportError;

/// Heartbeat timing for a socket session.
#[derive(Clone, Copy, Debug)]
pub struct Heartbeat {
    /// Interval between server Ping frames.
    pub ping_interval: Duration,
    /// Drop the peer after this long without a Pong.
    pub pong_timeout: Duration,
}

/// Transport over an upgraded `WebSocket`.
pub struct SocketTransport {
    core: TransportCore,
    client_id: String,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
    last_pong: Mutex<Instant>,
}

impl std::fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketTransport")
            .field("session_id", self.core.session_id())
            .field("client_id", &self.client_id)
            .field("closed", &self.core.is_closed())
            .finish_non_exhaustive()
    }
}

impl SocketTransport {
    /// Create a transport for an authenticated client and the receiving end
    /// of its outbound queue.
    pub fn new(
        session_id: SessionId,
        client_id: impl Into<String>,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let transport = Arc::new(Self {
            core: TransportCore::new(session_id),
            client_id: client_id.into(),
            tx,
            cancel: CancellationToken::new(),
            last_pong: Mutex::new(Instant::now()),
        });
        (transport, rx)
    }

    /// Client the socket authenticated as.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Record liveness from the peer.
    pub fn mark_alive(&self) {
        *self.last_pong.lock() = Instant::now();
    }

    /// Time since the peer was last heard from.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Hand one inbound payload to the registered handler.
    pub async fn handle_inbound(self: &Arc<Self>, payload: Value) -> Result<(), TransportError> {
        let transport: Arc<dyn Transport> = self.clone();
        deliver(&self.core, transport, payload).await
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn session_id(&self) -> &SessionId {
        self.core.session_id()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    async fn send(&self, response: &RpcResponse) -> Result<(), TransportError> {
        if self.core.is_closed() {
            return Err(TransportError::Closed);
        }
        let json = serde_json::to_string(response)?;
        self.tx.send(json).await.map_err(|_| TransportError::Closed)
    }

    fn on_message(&self, handler: Arc<dyn InboundHandler>) -> Option<Arc<dyn InboundHandler>> {
        self.core.replace_handler(handler)
    }

    fn on_close(&self, hook: CloseHook) {
        self.core.add_close_hook(hook);
    }

    fn close(&self) {
        if self.core.mark_closed() {
            self.cancel.cancel();
            debug!(session_id = %self.core.session_id(), "socket closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Close an upgraded socket straight away with a policy-violation frame.
pub async fn reject_socket(mut ws: WebSocket, reason: &'static str) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: reason.into(),
    };
    let _ = ws.send(Message::Close(Some(frame))).await;
}

/// Run a socket session from upgrade through disconnect.
///
/// 1. Forwards queued responses to the peer, with periodic Ping frames
/// 2. Hands each inbound text frame to the transport's handler on its own task
/// 3. Drops peers that stop answering Pings
/// 4. Closes the transport on exit, which removes its session
#[instrument(skip_all, fields(session_id = %transport.session_id(), client_id = %transport.client_id()))]
pub async fn run_socket_session(
    ws: WebSocket,
    transport: Arc<SocketTransport>,
    mut outbound_rx: mpsc::Receiver<String>,
    heartbeat: Heartbeat,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    info!("socket connected");

    let cancel = transport.cancel.clone();
    let outbound_transport = transport.clone();
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat.ping_interval);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(Some(CloseFrame {
                        code: close_code::NORMAL,
                        reason: "".into(),
                    }))).await;
                    break;
                }
                msg = outbound_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if outbound_transport.last_pong_elapsed() > heartbeat.pong_timeout {
                        warn!("peer unresponsive for {:?}, disconnecting", heartbeat.pong_timeout);
                        break;
                    }
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        outbound_transport.close();
    });

    loop {
        let msg = tokio::select! {
            () = transport.cancel.cancelled() => break,
            msg = ws_rx.next() => msg,
        };
        let Some(Ok(msg)) = msg else { break };

        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Ping(_) | Message::Pong(_) => {
                transport.mark_alive();
                continue;
            }
            Message::Close(_) => {
                info!("peer sent close frame");
                break;
            }
        };
        transport.mark_alive();

        let transport = transport.clone();
        drop(tokio::spawn(async move {
            let result = match parse_frame(&text) {
                Ok(payload) => transport.handle_inbound(payload).await,
                Err(e) => transport.send(&e.into_response()).await,
            };
            if let Err(e) = result {
                debug!(error = %e, "inbound frame not answered");
            }
        }));
    }

    transport.close();
    if tokio::time::timeout(Duration::from_secs(1), outbound).await.is_err() {
        debug!("outbound forwarder did not stop in time");
    }
    info!("socket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl InboundHandler for EchoHandler {
        async fn handle(
            &self,
            payload: Value,
            transport: Arc<dyn Transport>,
        ) -> Result<(), TransportError> {
            let id = payload["id"].as_str().unwrap_or("unknown").to_owned();
            transport.send(&RpcResponse::success(id, json!({}))).await
        }
    }

    #[tokio::test]
    async fn inbound_reply_is_queued() {
        let (t, mut rx) = SocketTransport::new(SessionId::from("s1"), "alpha", 8);
        let _ = t.on_message(Arc::new(EchoHandler));
        t.handle_inbound(json!({"id": "q1"})).await.unwrap();
        let text = rx.recv().await.unwrap();
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"id": "q1"}));
    }

    #[tokio::test]
    async fn inbound_without_handler_is_not_ready() {
        let (t, _rx) = SocketTransport::new(SessionId::from("s1"), "alpha", 8);
        assert_matches!(
            t.handle_inbound(json!({"id": "q1"})).await,
            Err(TransportError::HandlerNotReady)
        );
    }

    #[tokio::test]
    async fn close_cancels_and_rejects_sends() {
        let (t, _rx) = SocketTransport::new(SessionId::from("s1"), "alpha", 8);
        t.close();
        assert!(t.is_closed());
        assert!(t.cancel.is_cancelled());
        assert_matches!(
            t.send(&RpcResponse::error("x", "y")).await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn send_fails_when_forwarder_gone() {
        let (t, rx) = SocketTransport::new(SessionId::from("s1"), "alpha", 8);
        drop(rx);
        assert_matches!(
            t.send(&RpcResponse::error("x", "y")).await,
            Err(TransportError::Closed)
        );
    }

    #[test]
    fn mark_alive_resets_elapsed() {
        let (t, _rx) = SocketTransport::new(SessionId::from("s1"), "alpha", 8);
        *t.last_pong.lock() = Instant::now() - Duration::from_secs(120);
        assert!(t.last_pong_elapsed() >= Duration::from_secs(120));
        t.mark_alive();
        assert!(t.last_pong_elapsed() < Duration::from_secs(5));
        assert_eq!(t.client_id(), "alpha");
    }
}
