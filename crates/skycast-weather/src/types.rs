use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LocationError;

/// Weather condition categories mapped from OpenWeatherMap condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCode {
    Clear,
    Clouds,
    Drizzle,
    Rain,
    Thunderstorm,
    Snow,
    /// Mist, smoke, haze, dust, fog, sand, ash, squalls, tornadoes
    Atmosphere,
    #[default]
    Other,
}

impl ConditionCode {
    /// Classify an OpenWeatherMap condition.
    /// See: https://openweathermap.org/weather-conditions
    ///
    /// The numeric id decides; `main` is only consulted when the id is outside
    /// the documented groups.
    pub fn from_owm(id: i64, main: &str) -> Self {
        match id {
            200..=299 => Self::Thunderstorm,
            300..=399 => Self::Drizzle,
            500..=599 => Self::Rain,
            600..=699 => Self::Snow,
            700..=799 => Self::Atmosphere,
            800 => Self::Clear,
            801..=899 => Self::Clouds,
            _ => Self::from_main(main),
        }
    }

    fn from_main(main: &str) -> Self {
        match main.trim().to_ascii_lowercase().as_str() {
            "thunderstorm" => Self::Thunderstorm,
            "drizzle" => Self::Drizzle,
            "rain" => Self::Rain,
            "snow" => Self::Snow,
            "clear" => Self::Clear,
            "clouds" => Self::Clouds,
            "mist" | "smoke" | "haze" | "dust" | "fog" | "sand" | "ash" | "squall"
            | "tornado" => Self::Atmosphere,
            _ => Self::Other,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Clouds => "Cloudy",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::Atmosphere => "Fog",
            Self::Other => "Unknown",
        }
    }

    /// Asset key for presentation layers
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sunny",
            Self::Clouds => "cloudy",
            Self::Drizzle | Self::Rain => "rain",
            Self::Thunderstorm => "storm",
            Self::Snow => "snow",
            Self::Atmosphere => "fog",
            // default asset
            Self::Other => "sunny",
        }
    }
}

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(LocationError::InvalidInput(format!(
                "coordinate must be finite, got ({latitude}, {longitude})"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::InvalidInput(format!(
                "latitude {latitude} is outside -90..=90"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidInput(format!(
                "longitude {longitude} is outside -180..=180"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Raw readings, metric units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainMetrics {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// hPa
    pub pressure: f64,
    /// Percent
    pub humidity: f64,
    /// hPa; missing for some stations
    pub sea_level: Option<f64>,
    /// hPa; missing for some stations
    pub ground_level: Option<f64>,
}

/// Current weather conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub location_name: String,
    pub metrics: MainMetrics,
    pub condition: ConditionCode,
}

/// One 3-hour forecast slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    pub metrics: MainMetrics,
    pub condition: ConditionCode,
}

/// Upcoming midday forecasts derived from one fetch cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub upcoming: Vec<ForecastEntry>,
    /// Local date the selection was computed against
    pub reference_date: NaiveDate,
}

impl Summary {
    pub fn len(&self) -> usize {
        self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForecastEntry> {
        self.upcoming.iter()
    }
}
