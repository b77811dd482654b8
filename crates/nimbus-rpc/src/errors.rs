//! RPC error codes and error type.

// ── Error code constants ────────────────────────────────────────────

/// Request `type` has no registered handler.
pub const UNKNOWN_REQUEST_TYPE: &str = "UNKNOWN_REQUEST_TYPE";
/// Envelope or tool arguments failed validation.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
/// `params.name` is not in the tool catalog.
pub const UNKNOWN_TOOL: &str = "UNKNOWN_TOOL";
/// The external lookup failed.
pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Error type returned by request handlers.
///
/// The display string is what the client sees in the `error` field.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// No handler for the request type.
    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),

    /// Malformed envelope or arguments.
    #[error("{0}")]
    Validation(String),

    /// Requested tool is not in the catalog.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// External collaborator failed.
    #[error("{0}")]
    Upstream(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl RpcError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownRequestType(_) => UNKNOWN_REQUEST_TYPE,
            Self::Validation(_) => VALIDATION_ERROR,
            Self::UnknownTool(_) => UNKNOWN_TOOL,
            Self::Upstream(_) => UPSTREAM_ERROR,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization failed: {err}"))
    }
}
