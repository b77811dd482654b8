//! Push-stream transport: a server-sent event stream for responses, with
//! requests arriving through separate delivery calls.
//!
//! The event stream is one-way, so client-to-server data travels on
//! `POST <messageEndpoint>?sessionId=<id>`, and the session id correlates the
//! call back to the open stream. The first event on every stream is
//! `endpoint`, telling the client where to post.

use std::any::Any;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use nimbus_core::ids::SessionId;
use nimbus_rpc::RpcResponse;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, instrument};

use super::{CloseHook, InboundHandler, Transport, TransportCore, TransportKind, deliver};
use crate::errors::TransportError;

/// One event queued for the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamFrame {
    /// `event: endpoint` carrying the delivery URL.
    Endpoint(String),
    /// `event: message` carrying one serialized response.
    Message(String),
}

impl StreamFrame {
    /// Render as a server-sent event.
    pub fn into_event(self) -> Event {
        match self {
            Self::Endpoint(url) => Event::default().event("endpoint").data(url),
            Self::Message(json) => Event::default().event("message").data(json),
        }
    }
}

/// Server-push transport backed by an SSE response.
pub struct PushStreamTransport {
    core: TransportCore,
    tx: Mutex<Option<mpsc::Sender<StreamFrame>>>,
}

impl std::fmt::Debug for PushStreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushStreamTransport")
            .field("session_id", self.core.session_id())
            .field("closed", &self.core.is_closed())
            .finish_non_exhaustive()
    }
}

impl PushStreamTransport {
    /// Create a transport and the receiving end of its event queue.
    pub fn new(session_id: SessionId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<StreamFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let transport = Arc::new(Self {
            core: TransportCore::new(session_id),
            tx: Mutex::new(Some(tx)),
        });
        (transport, rx)
    }

    /// Delivery URL for this session under `message_endpoint`.
    pub fn endpoint_url(&self, message_endpoint: &str) -> String {
        format!("{message_endpoint}?sessionId={}", self.core.session_id())
    }

    /// Queue the `endpoint` event. Call before the stream is handed out.
    pub fn announce_endpoint(&self, message_endpoint: &str) -> Result<(), TransportError> {
        let url = self.endpoint_url(message_endpoint);
        self.sender()?
            .try_send(StreamFrame::Endpoint(url))
            .map_err(|_| TransportError::Closed)
    }

    fn sender(&self) -> Result<mpsc::Sender<StreamFrame>, TransportError> {
        self.tx.lock().clone().ok_or(TransportError::Closed)
    }

    /// Run a delivery call through the registered handler.
    ///
    /// The handler's reply is pushed onto the stream before this returns, so
    /// acknowledging the call after `Ok` never races the response.
    #[instrument(skip_all, fields(session_id = %self.core.session_id()))]
    pub async fn handle_post_message(self: &Arc<Self>, payload: Value) -> Result<(), TransportError> {
        let transport: Arc<dyn Transport> = self.clone();
        deliver(&self.core, transport, payload).await
    }

    /// Wrap the queue receiver as an SSE body that closes this transport
    /// when the client goes away.
    pub fn event_stream(self: &Arc<Self>, rx: mpsc::Receiver<StreamFrame>) -> EventStream {
        EventStream {
            inner: ReceiverStream::new(rx),
            transport: self.clone(),
        }
    }
}

#[async_trait]
impl Transport for PushStreamTransport {
    fn session_id(&self) -> &SessionId {
        self.core.session_id()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::PushStream
    }

    async fn send(&self, response: &RpcResponse) -> Result<(), TransportError> {
        let json = serde_json::to_string(response)?;
        let tx = self.sender()?;
        tx.send(StreamFrame::Message(json))
            .await
            .map_err(|_| TransportError::Closed)
    }

    fn on_message(&self, handler: Arc<dyn InboundHandler>) -> Option<Arc<dyn InboundHandler>> {
        self.core.replace_handler(handler)
    }

    fn on_close(&self, hook: CloseHook) {
        self.core.add_close_hook(hook);
    }

    fn close(&self) {
        if self.core.mark_closed() {
            let _ = self.tx.lock().take();
            debug!(session_id = %self.core.session_id(), "push stream closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// SSE body for one push-stream session.
///
/// Ends when the transport closes; dropping it (client disconnect) closes
/// the transport.
pub struct EventStream {
    inner: ReceiverStream<StreamFrame>,
    transport: Arc<PushStreamTransport>,
}

impl Stream for EventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner
            .poll_next_unpin(cx)
            .map(|frame| frame.map(|f| Ok(f.into_event())))
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    /// Replies with the payload's `id` echoed back.
    struct EchoHandler;

    #[async_trait]
    impl InboundHandler for EchoHandler {
        async fn handle(
            &self,
            payload: Value,
            transport: Arc<dyn Transport>,
        ) -> Result<(), TransportError> {
            let id = payload["id"].as_str().unwrap_or("unknown").to_owned();
            transport
                .send(&RpcResponse::success(id, json!({"echo": payload})))
                .await
        }
    }

    #[tokio::test]
    async fn endpoint_is_first_frame() {
        let (t, mut rx) = PushStreamTransport::new(SessionId::from("s1"), 8);
        t.announce_endpoint("/message").unwrap();
        assert_eq!(
            rx.recv().await,
            Some(StreamFrame::Endpoint("/message?sessionId=s1".into()))
        );
    }

    #[tokio::test]
    async fn post_without_handler_is_not_ready() {
        let (t, _rx) = PushStreamTransport::new(SessionId::from("s1"), 8);
        assert_matches!(
            t.handle_post_message(json!({"id": "1"})).await,
            Err(TransportError::HandlerNotReady)
        );
    }

    #[tokio::test]
    async fn post_pushes_reply_before_returning() {
        let (t, mut rx) = PushStreamTransport::new(SessionId::from("s1"), 8);
        assert!(t.on_message(Arc::new(EchoHandler)).is_none());

        t.handle_post_message(json!({"id": "r1"})).await.unwrap();
        let Ok(StreamFrame::Message(text)) = rx.try_recv() else {
            panic!("expected a queued message frame");
        };
        let frame: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(frame["id"], "r1");
    }

    #[tokio::test]
    async fn replacing_handler_returns_previous() {
        let (t, _rx) = PushStreamTransport::new(SessionId::from("s1"), 8);
        assert!(t.on_message(Arc::new(EchoHandler)).is_none());
        assert!(t.on_message(Arc::new(EchoHandler)).is_some());
    }

    #[tokio::test]
    async fn close_ends_stream_and_rejects_sends() {
        let (t, mut rx) = PushStreamTransport::new(SessionId::from("s1"), 8);
        t.close();
        t.close();
        assert!(t.is_closed());
        assert_eq!(rx.recv().await, None);
        assert_matches!(
            t.send(&RpcResponse::error("x", "y")).await,
            Err(TransportError::Closed)
        );
        assert_matches!(
            t.handle_post_message(json!({})).await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn dropping_event_stream_closes_transport() {
        let (t, rx) = PushStreamTransport::new(SessionId::from("s1"), 8);
        let stream = t.event_stream(rx);
        assert!(!t.is_closed());
        drop(stream);
        assert!(t.is_closed());
    }

    #[tokio::test]
    async fn event_stream_yields_frames() {
        let (t, rx) = PushStreamTransport::new(SessionId::from("s1"), 8);
        t.announce_endpoint("/message").unwrap();
        t.send(&RpcResponse::error("1", "boom")).await.unwrap();
        let mut stream = t.event_stream(rx);
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());
        t.close();
        assert!(stream.next().await.is_none());
    }
}
