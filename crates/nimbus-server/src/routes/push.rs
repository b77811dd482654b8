//! Push-stream routes: the event stream and its delivery call.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Query, State};
use axum::response::Sse;
use axum::response::sse::{KeepAlive, KeepAliveStream};
use nimbus_core::ids::SessionId;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::AppState;
use crate::errors::ApiError;
use crate::transport::PushStreamTransport;
use crate::transport::push_stream::EventStream;

/// GET /sse, GET /weather
///
/// Registers a new session and opens its event stream. The first event
/// names the delivery URL, including the server-chosen session id.
pub async fn open_stream(
    State(state): State<AppState>,
) -> Result<Sse<KeepAliveStream<EventStream>>, ApiError> {
    let (transport, rx) =
        PushStreamTransport::new(SessionId::new(), state.config.send_queue_capacity);
    let session = state.protocol.connect(transport.clone(), None)?;
    transport.announce_endpoint(&state.config.message_endpoint)?;

    info!(session_id = %session.session_id, "push stream opened");
    Ok(Sse::new(transport.event_stream(rx)).keep_alive(KeepAlive::default()))
}

/// Query string of a delivery call.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    /// Session the call belongs to.
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// POST <messageEndpoint>?sessionId=<id>
///
/// Runs the request through the session's handler. The response goes out on
/// the event stream; this call only acknowledges delivery.
pub async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = body?;
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("sessionId is required".into()))?;

    let transport = state
        .protocol
        .connections()
        .lookup(&session_id)
        .ok_or_else(ApiError::session_not_found)?;
    let transport: Arc<PushStreamTransport> = transport
        .into_any()
        .downcast()
        .map_err(|_| ApiError::BadRequest("Session does not accept delivery calls".into()))?;

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))?;

    transport.handle_post_message(payload).await?;
    debug!(session_id = %session_id, "delivery call handled");
    Ok(Json(json!({ "status": "ok" })))
}
