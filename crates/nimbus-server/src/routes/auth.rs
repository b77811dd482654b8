//! Credential endpoints: `/register`, `/token`, `/revoke`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use nimbus_auth::{CredentialAuthority, bearer_token};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::AppState;
use crate::errors::ApiError;

/// Close reason and 401 message for a missing or malformed bearer header.
pub const INVALID_AUTHENTICATION: &str = "Invalid authentication";
/// Close reason and 401 message for an unknown API key.
pub const INVALID_API_KEY: &str = "Invalid API key";

/// Resolve the client behind an `Authorization: Bearer <apiKey>` header.
pub fn authenticate(
    headers: &HeaderMap,
    authority: &CredentialAuthority,
) -> Result<String, &'static str> {
    let key = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or(INVALID_AUTHENTICATION)?;
    authority.verify_api_key(key).ok_or(INVALID_API_KEY)
}

fn authenticate_http(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    authenticate(headers, &state.authority).map_err(|reason| {
        warn!(reason, "rejected credential");
        ApiError::Unauthorized(reason.into())
    })
}

/// Parse an optional JSON body. An empty body is `Null`.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = parse_body(&body?)?;
    let client_id = body
        .get("clientId")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("clientId is required".into()))?;

    let api_key = state.authority.issue_api_key(client_id);
    info!(client_id, "client registered");
    Ok(Json(json!({ "apiKey": api_key })))
}

#[derive(Debug, Default, Deserialize)]
struct TokenRequest {
    #[serde(default)]
    permissions: Option<Vec<String>>,
}

/// POST /token
pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiError> {
    let client_id = authenticate_http(&state, &headers)?;
    let request = match parse_body(&body?)? {
        Value::Null => TokenRequest::default(),
        value => serde_json::from_value::<TokenRequest>(value)
            .map_err(|e| ApiError::BadRequest(format!("Invalid token request: {e}")))?,
    };
    let permissions = request
        .permissions
        .unwrap_or_else(|| state.config.default_permissions.clone());

    let token = state
        .authority
        .issue_token(&client_id, &permissions)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(client_id = %client_id, permissions = permissions.len(), "token issued");
    Ok(Json(json!({
        "token": token,
        "expiresIn": state.authority.ttl().as_secs(),
    })))
}

/// POST /revoke
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let client_id = authenticate_http(&state, &headers)?;
    let revoked = state.authority.revoke(&client_id);
    let closed = state.protocol.close_client(&client_id);
    info!(client_id = %client_id, closed, "credential revoked");
    Ok(Json(json!({
        "revoked": revoked,
        "closedSessions": closed,
    })))
}
