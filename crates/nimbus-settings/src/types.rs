//! Settings types.
//!
//! Every struct is `#[serde(default)]` so a partial settings file only needs
//! to name the values it changes.

use serde::{Deserialize, Serialize};

/// Placeholder signing secret. Startup logs a warning while it is in use.
pub const DEFAULT_SECRET_KEY: &str = "your-secret-key-here";

/// Fixed HTTP routes. The message endpoint may not reuse any of them.
pub const RESERVED_PATHS: &[&str] = &[
    "/", "/health", "/register", "/token", "/revoke", "/sse", "/weather", "/ws",
];

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NimbusSettings {
    /// HTTP / transport settings.
    pub server: ServerSettings,
    /// Credential authority settings.
    pub auth: AuthSettings,
    /// Upstream weather provider settings.
    pub weather: WeatherSettings,
    /// Rate limiting (configuration data only).
    pub rate_limit: RateLimitSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Server network and transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Maximum HTTP body and socket frame size in bytes.
    pub max_payload_size: usize,
    /// Outbound queue depth per connection.
    pub send_queue_capacity: usize,
    /// Interval between socket Ping frames, in seconds.
    pub ping_interval_secs: u64,
    /// Drop a socket peer after this many seconds without a Pong.
    pub pong_timeout_secs: u64,
    /// Path clients POST requests to for push-stream sessions.
    pub message_endpoint: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_payload_size: 1024 * 1024,
            send_queue_capacity: 256,
            ping_interval_secs: 30,
            pong_timeout_secs: 60,
            message_endpoint: "/message".to_string(),
        }
    }
}

impl ServerSettings {
    /// The message endpoint with surrounding whitespace removed and a
    /// leading `/`. Blank falls back to `/message`.
    pub fn message_path(&self) -> String {
        let trimmed = self.message_endpoint.trim();
        if trimmed.is_empty() {
            "/message".into()
        } else if trimmed.starts_with('/') {
            trimmed.to_owned()
        } else {
            format!("/{trimmed}")
        }
    }
}

/// Credential authority settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// HMAC secret used to sign bearer tokens.
    pub secret_key: String,
    /// Token validity window in seconds.
    pub token_ttl_secs: u64,
    /// Permissions embedded when a token request names none.
    pub default_permissions: Vec<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            token_ttl_secs: 3600,
            default_permissions: vec!["tools:list".to_string(), "tools:call".to_string()],
        }
    }
}

impl AuthSettings {
    /// Whether the signing secret is still the compiled placeholder.
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key.is_empty() || self.secret_key == DEFAULT_SECRET_KEY
    }
}

/// Upstream weather provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherSettings {
    /// Provider API key. Required at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Provider base URL (the `/weather` path is appended).
    pub base_url: String,
    /// Unit system passed to the provider.
    pub units: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            units: "metric".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Rate limiting window. Loaded and reported, never enforced.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitSettings {
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Requests allowed per window.
    pub max: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_ms: 15 * 60 * 1000,
            max: 100,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(NimbusSettings::default()).unwrap();
        assert!(json["server"].get("maxPayloadSize").is_some());
        assert!(json["auth"].get("tokenTtlSecs").is_some());
        assert!(json.get("rateLimit").is_some());
        assert!(json["weather"].get("apiKey").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: NimbusSettings =
            serde_json::from_str(r#"{"server": {"port": 8080}}"#).unwrap();
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.auth.token_ttl_secs, 3600);
    }

    #[test]
    fn default_secret_detection() {
        let mut auth = AuthSettings::default();
        assert!(auth.uses_default_secret());
        auth.secret_key = "a-real-secret".into();
        assert!(!auth.uses_default_secret());
        auth.secret_key = String::new();
        assert!(auth.uses_default_secret());
    }

    #[test]
    fn default_permissions() {
        let auth = AuthSettings::default();
        assert_eq!(auth.default_permissions, vec!["tools:list", "tools:call"]);
    }
}
