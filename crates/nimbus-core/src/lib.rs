//! # nimbus-core
//!
//! Foundation types shared by every nimbus crate:
//!
//! - **Branded IDs**: `SessionId` as a newtype for type safety
//! - **Tool schemas**: `ToolDefinition`, `ToolParameterSchema`, and the
//!   `ToolCallResult` content shape returned by tool execution
//! - **Logging**: `init_subscriber` for the process-wide `tracing` subscriber

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod logging;
pub mod tools;
