//! # nimbus-server
//!
//! Axum HTTP surface and the transport layer of the nimbus protocol.
//!
//! - [`transport`]: the `Transport` abstraction with its push-stream (SSE)
//!   and socket (`WebSocket`) implementations
//! - [`registry`]: `ConnectionRegistry`, live sessions keyed by session id
//! - [`protocol`]: `ProtocolServer`, wiring transports to the dispatcher
//! - [`routes`]: registration, token, event-stream, delivery and socket
//!   endpoints
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod protocol;
pub mod registry;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod transport;
