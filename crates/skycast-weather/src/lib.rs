//! Weather domain for SkyCast
//!
//! Coordinates from a location service or manual entry, current weather and
//! the 5-day forecast from OpenWeatherMap, and the midday summary selector.

pub mod error;
pub mod location;
pub mod provider;
pub mod retry;
pub mod selector;
pub mod types;

pub use error::{FailureReason, FetchError, LocationError};
pub use location::{
    acquire_with_timeout, locate, parse_manual_coordinate, AccuracyHint,
    ConfiguredLocationProvider, GeoLocationProvider, PermissionStatus,
};
pub use provider::{OpenWeatherClient, WeatherFetcher, DEFAULT_BASE_URL};
pub use retry::RetryConfig;
pub use selector::{select_upcoming, SelectionWindow};
pub use types::*;
