//! Server configuration.

use std::time::Duration;

use nimbus_settings::NimbusSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the nimbus server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Max HTTP body and socket message size in bytes.
    pub max_payload_size: usize,
    /// Outbound queue depth per transport.
    pub send_queue_capacity: usize,
    /// Socket Ping interval in seconds.
    pub ping_interval_secs: u64,
    /// Close a socket after this many seconds without a Pong.
    pub pong_timeout_secs: u64,
    /// Path push-stream clients POST requests to.
    pub message_endpoint: String,
    /// Permissions granted by `POST /token` when the body names none.
    pub default_permissions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_payload_size: 1024 * 1024,
            send_queue_capacity: 256,
            ping_interval_secs: 30,
            pong_timeout_secs: 60,
            message_endpoint: "/message".into(),
            default_permissions: vec!["tools:list".into(), "tools:call".into()],
        }
    }
}

impl ServerConfig {
    /// Derive the server configuration from loaded settings.
    pub fn from_settings(settings: &NimbusSettings) -> Self {
        let server = &settings.server;
        Self {
            host: server.host.clone(),
            port: server.port,
            max_payload_size: server.max_payload_size,
            send_queue_capacity: server.send_queue_capacity.max(1),
            ping_interval_secs: server.ping_interval_secs,
            pong_timeout_secs: server.pong_timeout_secs,
            message_endpoint: server.message_path(),
            default_permissions: settings.auth.default_permissions.clone(),
        }
    }

    /// Ping interval, never shorter than one second.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    /// Pong timeout.
    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_loopback_on_any_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
        assert_eq!(cfg.message_endpoint, "/message");
    }

    #[test]
    fn from_settings_copies_values() {
        let mut settings = NimbusSettings::default();
        settings.server.port = 8080;
        settings.server.max_payload_size = 4096;
        settings.auth.default_permissions = vec!["tools:list".into()];

        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.max_payload_size, 4096);
        assert_eq!(cfg.default_permissions, vec!["tools:list"]);
    }

    #[test]
    fn message_endpoint_is_normalized() {
        let mut settings = NimbusSettings::default();
        settings.server.message_endpoint = "rpc".into();
        assert_eq!(ServerConfig::from_settings(&settings).message_endpoint, "/rpc");
        settings.server.message_endpoint = String::new();
        assert_eq!(ServerConfig::from_settings(&settings).message_endpoint, "/message");
    }

    #[test]
    fn ping_interval_has_floor() {
        let cfg = ServerConfig {
            ping_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.ping_interval(), Duration::from_secs(1));
    }
}
