//! # nimbus-settings
//!
//! Configuration management with layered sources for the nimbus server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** - [`NimbusSettings::default()`]
//! 2. **Settings file** - `~/.nimbus/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** - `PORT`, `SECRET_KEY`, `NIMBUS_*` overrides
//!    (highest priority)
//!
//! The rate-limit section is carried as data only; nothing enforces it.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path, validate_settings,
};
pub use types::*;
