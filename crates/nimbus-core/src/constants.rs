//! Package-level constants.

/// Current version of the nimbus server (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name advertised to clients.
pub const SERVER_NAME: &str = "weather-server";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3, "VERSION must be semver (MAJOR.MINOR.PATCH)");
        for part in parts {
            let _: u32 = part.parse().expect("each semver segment must be a number");
        }
    }

    #[test]
    fn server_name_is_lowercase() {
        assert_eq!(SERVER_NAME, SERVER_NAME.to_lowercase());
    }
}
