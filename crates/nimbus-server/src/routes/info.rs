//! `GET /` and `GET /health`.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use nimbus_core::constants::{SERVER_NAME, VERSION};
use serde::Serialize;
use serde_json::{Value, json};

use super::AppState;
use crate::transport::TransportKind;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Live sessions of every kind.
    pub connections: usize,
    /// Live push-stream sessions.
    pub push_streams: usize,
    /// Live socket sessions.
    pub sockets: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, push_streams: usize, sockets: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: push_streams + sockets,
        push_streams,
        sockets,
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.protocol.connections();
    Json(health_check(
        state.start_time,
        connections.count(TransportKind::PushStream),
        connections.count(TransportKind::Socket),
    ))
}

/// GET /
pub async fn service_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Weather API is running",
        "name": SERVER_NAME,
        "version": VERSION,
        "endpoints": {
            "sse": "/sse",
            "message": state.config.message_endpoint,
            "ws": "/ws",
        },
    }))
}
