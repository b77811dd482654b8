//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`NimbusSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{NimbusSettings, RESERVED_PATHS};

/// Resolve the path to the settings file (`~/.nimbus/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".nimbus").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<NimbusSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults (plus env overrides). If the
/// file contains invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<NimbusSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults deep-merged with the settings file, without env overrides.
fn load_file_layer(path: &Path) -> Result<NimbusSettings> {
    let defaults = serde_json::to_value(NimbusSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_owned(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut NimbusSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// When several names map to the same setting, the first non-empty one wins
/// (`NIMBUS_*` names take precedence over the bare legacy names). Values that
/// fail to parse are ignored with a warning.
pub fn apply_overrides<F>(settings: &mut NimbusSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |names: &[&str]| -> Option<(String, String)> {
        names.iter().find_map(|name| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .map(|v| ((*name).to_string(), v))
        })
    };

    // ── Server ──────────────────────────────────────────────────────
    if let Some((key, val)) = read(&["NIMBUS_PORT", "PORT"]) {
        match parse_u16_range(&val, 1, 65535) {
            Some(port) => settings.server.port = port,
            None => warn!(key, value = %val, "invalid port env var, ignoring"),
        }
    }
    if let Some((_, val)) = read(&["NIMBUS_HOST", "HOST"]) {
        settings.server.host = val;
    }
    if let Some((key, val)) = read(&["NIMBUS_MAX_PAYLOAD"]) {
        match parse_usize_range(&val, 1024, 64 * 1024 * 1024) {
            Some(n) => settings.server.max_payload_size = n,
            None => warn!(key, value = %val, "invalid payload size env var, ignoring"),
        }
    }

    // ── Auth ────────────────────────────────────────────────────────
    if let Some((_, val)) = read(&["NIMBUS_SECRET_KEY", "SECRET_KEY"]) {
        settings.auth.secret_key = val;
    }

    // ── Weather ─────────────────────────────────────────────────────
    if let Some((_, val)) = read(&["OPENWEATHER_API_KEY"]) {
        settings.weather.api_key = Some(val);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some((_, val)) = read(&["NIMBUS_LOG_LEVEL"]) {
        settings.logging.level = val;
    }
    if let Some((key, val)) = read(&["NIMBUS_LOG_JSON"]) {
        match parse_bool(&val) {
            Some(b) => settings.logging.json = b,
            None => warn!(key, value = %val, "invalid boolean env var, ignoring"),
        }
    }
}

/// Check settings that must hold before the server can start.
///
/// A placeholder signing secret is allowed but logged as a warning.
pub fn validate_settings(settings: &NimbusSettings) -> Result<()> {
    if settings
        .weather
        .api_key
        .as_deref()
        .is_none_or(str::is_empty)
    {
        return Err(SettingsError::InvalidValue(
            "weather.apiKey is required (set OPENWEATHER_API_KEY)".into(),
        ));
    }
    if settings.server.max_payload_size == 0 {
        return Err(SettingsError::InvalidValue(
            "server.maxPayloadSize must be greater than zero".into(),
        ));
    }
    if settings.server.send_queue_capacity == 0 {
        return Err(SettingsError::InvalidValue(
            "server.sendQueueCapacity must be greater than zero".into(),
        ));
    }
    validate_message_path(&settings.server.message_path())?;
    if settings.auth.uses_default_secret() {
        warn!("using the default secret key; this is not secure for production");
    }
    Ok(())
}

/// The message endpoint must be a literal path that no fixed route uses.
fn validate_message_path(path: &str) -> Result<()> {
    let literal = path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '~'));
    if !literal || path.contains("//") {
        return Err(SettingsError::InvalidValue(format!(
            "server.messageEndpoint {path:?} must be a literal path"
        )));
    }
    if RESERVED_PATHS.contains(&path.trim_end_matches('/')) || path == "/" {
        return Err(SettingsError::InvalidValue(format!(
            "server.messageEndpoint {path:?} collides with a built-in route"
        )));
    }
    Ok(())
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn valid_settings() -> NimbusSettings {
        let mut s = NimbusSettings::default();
        s.weather.api_key = Some("owm-key".into());
        s
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 3000, "host": "0.0.0.0"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"perms": ["a", "b", "c"]});
        let source = serde_json::json!({"perms": ["z"]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["perms"], serde_json::json!(["z"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 8088}, "weather": {"apiKey": "from-file"}}"#,
        )
        .unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.server.port, 8088);
        assert_eq!(settings.server.message_endpoint, "/message");
        assert_eq!(settings.weather.api_key.as_deref(), Some("from-file"));
        assert_eq!(settings.weather.units, "metric");
    }

    #[test]
    fn invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        assert_matches!(load_file_layer(&path), Err(SettingsError::Parse { .. }));
    }

    #[test]
    fn wrong_value_type_is_a_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": "eighty"}}"#).unwrap();

        assert_matches!(load_file_layer(&path), Err(SettingsError::Shape(_)));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn legacy_port_and_secret_names() {
        let mut s = NimbusSettings::default();
        apply_overrides(&mut s, env(&[("PORT", "8080"), ("SECRET_KEY", "s3cret")]));
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.auth.secret_key, "s3cret");
    }

    #[test]
    fn prefixed_name_wins_over_legacy() {
        let mut s = NimbusSettings::default();
        apply_overrides(&mut s, env(&[("PORT", "8080"), ("NIMBUS_PORT", "9000")]));
        assert_eq!(s.server.port, 9000);
    }

    #[test]
    fn invalid_values_are_ignored() {
        let mut s = NimbusSettings::default();
        apply_overrides(
            &mut s,
            env(&[("PORT", "not-a-port"), ("NIMBUS_LOG_JSON", "maybe")]),
        );
        assert_eq!(s.server.port, 3000);
        assert!(!s.logging.json);
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut s = NimbusSettings::default();
        apply_overrides(&mut s, env(&[("HOST", ""), ("OPENWEATHER_API_KEY", "")]));
        assert_eq!(s.server.host, "0.0.0.0");
        assert!(s.weather.api_key.is_none());
    }

    #[test]
    fn weather_key_and_logging() {
        let mut s = NimbusSettings::default();
        apply_overrides(
            &mut s,
            env(&[
                ("OPENWEATHER_API_KEY", "abc"),
                ("NIMBUS_LOG_LEVEL", "debug"),
                ("NIMBUS_LOG_JSON", "yes"),
            ]),
        );
        assert_eq!(s.weather.api_key.as_deref(), Some("abc"));
        assert_eq!(s.logging.level, "debug");
        assert!(s.logging.json);
    }

    // ── validation ──────────────────────────────────────────────────

    #[test]
    fn validate_requires_weather_key() {
        let s = NimbusSettings::default();
        assert_matches!(validate_settings(&s), Err(SettingsError::InvalidValue(msg)) if msg.contains("apiKey"));
    }

    #[test]
    fn validate_rejects_zero_payload() {
        let mut s = valid_settings();
        s.server.max_payload_size = 0;
        assert_matches!(validate_settings(&s), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn validate_rejects_message_endpoint_on_builtin_route() {
        for endpoint in ["/register", "token", "/revoke/", " /sse ", "/"] {
            let mut s = valid_settings();
            s.server.message_endpoint = endpoint.into();
            assert_matches!(
                validate_settings(&s),
                Err(SettingsError::InvalidValue(msg)) if msg.contains("built-in route"),
                "{endpoint}"
            );
        }
    }

    #[test]
    fn validate_rejects_message_endpoint_with_captures() {
        for endpoint in ["/rpc/{id}", "/rpc/*rest", "/rpc/:id", "/a//b"] {
            let mut s = valid_settings();
            s.server.message_endpoint = endpoint.into();
            assert_matches!(
                validate_settings(&s),
                Err(SettingsError::InvalidValue(msg)) if msg.contains("literal path"),
                "{endpoint}"
            );
        }
    }

    #[test]
    fn validate_accepts_custom_message_endpoint() {
        let mut s = valid_settings();
        s.server.message_endpoint = "rpc/messages".into();
        assert!(validate_settings(&s).is_ok());
    }

    #[test]
    fn validate_accepts_default_secret_with_key() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in &["true", "1", "yes", "on", "TRUE"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in &["false", "0", "no", "off", "Off"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_u16_bounds() {
        assert_eq!(parse_u16_range("65535", 1, 65535), Some(65535));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("99999", 1, 65535), None);
    }

    #[test]
    fn parse_usize_bounds() {
        assert_eq!(parse_usize_range("2048", 1024, 4096), Some(2048));
        assert_eq!(parse_usize_range("10", 1024, 4096), None);
    }
}
