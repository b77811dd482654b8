//! Auth error types.

/// Errors from token issuance and verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Token is malformed, tampered with, or signed with another secret.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token signature is valid but its expiry has passed.
    #[error("token expired")]
    Expired,

    /// Encoding the token failed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::InvalidSignature,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
