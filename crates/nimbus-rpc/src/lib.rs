//! # nimbus-rpc
//!
//! The message protocol spoken over every nimbus transport.
//!
//! - [`types`]: `RpcRequest` / `RpcResponse` wire shapes
//! - [`envelope`]: validated decode of untrusted inbound payloads
//! - [`registry`]: `HandlerRegistry` mapping a request type to its handler
//! - [`handlers`]: the built-in `ListTools` and `CallTool` handlers
//! - [`catalog`]: the tool catalog and the `get_weather` tool
//!
//! Protocol failures (bad envelope, unknown type, unknown tool, invalid
//! arguments) become `{id, error}` frames. A tool that runs and fails
//! upstream yields a normal frame whose content is flagged `isError`.

#![deny(unsafe_code)]

pub mod catalog;
pub mod context;
pub mod envelope;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;
pub mod validation;

pub use catalog::{Tool, ToolCatalog, WeatherTool};
pub use context::RpcContext;
pub use envelope::{DecodeError, UNKNOWN_ID, decode_value, parse_frame};
pub use errors::RpcError;
pub use registry::{HandlerRegistry, RequestHandler};
pub use types::{RpcRequest, RpcResponse, ToolCallParams};
