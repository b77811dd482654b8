//! Weather lookup errors.
//!
//! Display strings are surfaced verbatim to tool callers, so they read as
//! user-facing messages.

/// Errors from a weather lookup.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// Provider reported the city as unknown.
    #[error("City '{0}' not found")]
    NotFound(String),

    /// Provider returned a non-success status.
    #[error("Weather API error: {0}")]
    Api(String),

    /// Transport failure talking to the provider (including timeouts).
    #[error("Weather API error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered 2xx with a body we could not map.
    #[error("Weather API error: unexpected response: {0}")]
    Decode(String),

    /// No provider API key configured.
    #[error("weather API key is not configured")]
    MissingApiKey,
}
