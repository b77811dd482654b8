//! # nimbus-weather
//!
//! The lookup collaborator behind the `get_weather` tool.
//!
//! [`WeatherLookup`] is the seam the dispatcher depends on; the protocol layer
//! never sees HTTP. [`OpenWeatherClient`] implements it against the
//! `OpenWeatherMap` current-weather endpoint and enforces its own timeout.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod types;

pub use client::OpenWeatherClient;
pub use errors::WeatherError;
pub use types::{WeatherLookup, WeatherRecord};
