//! Credential authority: token signing and API key management.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::errors::AuthError;
use crate::store::ApiKeyStore;

/// Default token validity window.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// JWT claims embedded in every token.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenClaims {
    client_id: String,
    permissions: BTreeSet<String>,
    /// Issued at (Unix timestamp).
    iat: i64,
    /// Expires at (Unix timestamp).
    exp: i64,
}

/// Identity recovered from a valid token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Client the token was issued to.
    pub client_id: String,
    /// Permissions embedded at issuance.
    pub permissions: BTreeSet<String>,
}

/// Issues and validates client credentials.
pub struct CredentialAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    keys: Arc<ApiKeyStore>,
}

impl std::fmt::Debug for CredentialAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialAuthority")
            .field("ttl", &self.ttl)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl CredentialAuthority {
    /// Create an authority signing with `secret` and storing keys in `keys`.
    pub fn new(secret: &str, keys: Arc<ApiKeyStore>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: DEFAULT_TOKEN_TTL,
            keys,
        }
    }

    /// Override the token validity window.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Token validity window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // ── Tokens ──────────────────────────────────────────────────────────

    /// Sign a token for `client_id` carrying `permissions`.
    pub fn issue_token<I, S>(&self, client_id: &str, permissions: I) -> Result<String, AuthError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.sign(TokenClaims {
            client_id: client_id.to_owned(),
            permissions: permissions.into_iter().map(Into::into).collect(),
            iat: now,
            exp: now.saturating_add(ttl),
        })
    }

    fn sign(&self, claims: TokenClaims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded identity.
    pub fn verify_token(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let data =
            jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(VerifiedToken {
            client_id: data.claims.client_id,
            permissions: data.claims.permissions,
        })
    }

    /// Whether `token` is valid and grants `permission`. Any verification
    /// failure yields `false`.
    pub fn has_permission(&self, token: &str, permission: &str) -> bool {
        self.verify_token(token)
            .is_ok_and(|v| v.permissions.contains(permission))
    }

    // ── API keys ────────────────────────────────────────────────────────

    /// Generate a fresh key for `client_id`, replacing any earlier one.
    pub fn issue_api_key(&self, client_id: &str) -> String {
        let key = generate_key(client_id);
        let replaced = self.keys.insert(client_id, key.clone()).is_some();
        info!(client_id, replaced, "API key issued");
        key
    }

    /// Client owning `key`, if the key is currently active.
    pub fn verify_api_key(&self, key: &str) -> Option<String> {
        let client = self.keys.client_for(key);
        if client.is_none() {
            debug!("API key not recognized");
        }
        client
    }

    /// Drop the client's key. Returns whether one existed.
    pub fn revoke(&self, client_id: &str) -> bool {
        let existed = self.keys.remove(client_id).is_some();
        info!(client_id, existed, "API key revoked");
        existed
    }
}

/// 256 random bits mixed with the client id and a nanosecond timestamp,
/// hashed with SHA-256 and hex-encoded.
fn generate_key(client_id: &str) -> String {
    let random_bytes: [u8; 32] = rand::random();
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(client_id.as_bytes());
    hasher.update(nanos.to_be_bytes());
    hasher.update(random_bytes);
    format!("{:x}", hasher.finalize())
}

/// Extract the credential from an `Authorization: Bearer <value>` header.
pub fn bearer_token(header: &str) -> Option<&str> {
    let value = header.strip_prefix("Bearer ")?.trim();
    (!value.is_empty()).then_some(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
