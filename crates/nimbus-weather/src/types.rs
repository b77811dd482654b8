//! Lookup seam and record type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::WeatherError;

/// Current conditions for one city.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Temperature, rounded to whole units.
    pub temperature: i64,
    /// Short description (e.g. "light rain").
    pub conditions: String,
    /// Relative humidity in percent.
    pub humidity: i64,
    /// Wind speed, rounded to whole units.
    pub wind_speed: i64,
    /// City name as normalised by the provider.
    pub city: String,
}

/// Asynchronous city lookup.
///
/// Implementations own their timeout; callers never cancel a lookup.
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    /// Fetch current conditions for `city`.
    async fn lookup(&self, city: &str) -> Result<WeatherRecord, WeatherError>;
}
