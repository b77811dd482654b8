//! Settings errors.

use std::path::PathBuf;

use thiserror::Error;

/// Why `~/.nimbus/settings.json` (or its overrides) could not be used.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The settings file is not valid JSON.
    #[error("{} is not valid JSON: {source}", path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Parser failure, with line and column.
        source: serde_json::Error,
    },

    /// The merged settings do not fit the settings types, e.g. a string
    /// where `server.port` expects a number.
    #[error("settings do not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),

    /// A value that parses but cannot be served, e.g. a missing API key.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Settings result.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_errors_name_the_path() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/nimbus/settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "cannot read /etc/nimbus/settings.json: denied"
        );

        let source = serde_json::from_str::<serde_json::Value>("{port").unwrap_err();
        let err = SettingsError::Parse {
            path: PathBuf::from("settings.json"),
            source,
        };
        assert!(err.to_string().starts_with("settings.json is not valid JSON"));
    }

    #[test]
    fn invalid_value_is_prefixed() {
        let err = SettingsError::InvalidValue("weather.apiKey is required".into());
        assert_eq!(
            err.to_string(),
            "invalid settings value: weather.apiKey is required"
        );
    }
}
