//! HTTP routes.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | service info |
//! | `GET /health` | liveness and session counts |
//! | `POST /register` | issue an API key |
//! | `POST /token` | exchange an API key for a signed token |
//! | `POST /revoke` | revoke an API key and close its sockets |
//! | `GET /sse`, `GET /weather` | open a push stream |
//! | `POST <messageEndpoint>` | delivery call for a push stream |
//! | `GET /ws` | socket transport |

pub mod auth;
pub mod info;
pub mod push;
pub mod socket;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use nimbus_auth::CredentialAuthority;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::protocol::ProtocolServer;

/// Shared state accessible from Axum handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Dispatcher and live sessions.
    pub protocol: ProtocolServer,
    /// Token and API key issuer.
    pub authority: Arc<CredentialAuthority>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
}

/// Build the router with every route and the shared layers.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_payload_size;
    let message_endpoint = state.config.message_endpoint.clone();

    Router::new()
        .route("/", get(info::service_info))
        .route("/health", get(info::health))
        .route("/register", post(auth::register))
        .route("/token", post(auth::token))
        .route("/revoke", post(auth::revoke))
        .route("/sse", get(push::open_stream))
        .route("/weather", get(push::open_stream))
        .route(&message_endpoint, post(push::post_message))
        .route("/ws", get(socket::upgrade))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
