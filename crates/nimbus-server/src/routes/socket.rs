//! GET /ws: socket transport handshake.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::HeaderMap;
use axum::response::Response;
use nimbus_core::ids::SessionId;
use tracing::{error, warn};

use super::AppState;
use super::auth::authenticate;
use crate::transport::SocketTransport;
use crate::transport::socket::{Heartbeat, reject_socket, run_socket_session};

/// Authenticate the bearer API key, then upgrade.
///
/// A failed check still completes the upgrade so the client sees a
/// policy-violation close frame carrying the reason.
pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let client_id = match authenticate(&headers, &state.authority) {
        Ok(client_id) => client_id,
        Err(reason) => {
            warn!(reason, "socket authentication failed");
            return ws.on_upgrade(move |socket| reject_socket(socket, reason));
        }
    };

    let heartbeat = Heartbeat {
        ping_interval: state.config.ping_interval(),
        pong_timeout: state.config.pong_timeout(),
    };
    let capacity = state.config.send_queue_capacity;

    ws.max_message_size(state.config.max_payload_size)
        .on_upgrade(move |socket| async move {
            let (transport, rx) = SocketTransport::new(SessionId::new(), client_id.clone(), capacity);
            if let Err(e) = state.protocol.connect(transport.clone(), Some(client_id)) {
                error!(error = %e, "failed to register socket session");
                return;
            }
            run_socket_session(socket, transport, rx, heartbeat).await;
        })
}
