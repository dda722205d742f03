//! OpenWeatherMap client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::FetchError;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{ConditionCode, Coordinate, CurrentWeather, ForecastEntry, MainMetrics};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));

/// Retrieves current weather and the forecast for a coordinate.
///
/// Implementations are read-only and do not cache.
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    async fn fetch_current(&self, coordinate: Coordinate) -> Result<CurrentWeather, FetchError>;

    /// Forecast slots ordered ascending by timestamp.
    async fn fetch_forecast(&self, coordinate: Coordinate)
        -> Result<Vec<ForecastEntry>, FetchError>;
}

#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("retry", &self.retry)
            .finish()
    }
}

impl OpenWeatherClient {
    pub fn new(api_key: &str) -> Result<Self, FetchError> {
        Self::with_options(
            DEFAULT_BASE_URL,
            api_key,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            RetryConfig::default(),
        )
    }

    pub fn with_options(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, FetchError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(FetchError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `{base}/{endpoint}` for a coordinate in metric units and decode the body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        coordinate: Coordinate,
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();
        tracing::debug!("GET {}?lat={}&lon={}&units=metric", url, lat, lon);

        let response = with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("appid", self.api_key.as_str()),
                    ("units", "metric"),
                ])
                .send()
        })
        .await
        .map_err(|e| {
            // the URL carries the API key
            let e = e.without_url();
            tracing::warn!("{} request failed: {}", endpoint, e);
            FetchError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} returned status {}", endpoint, status);
            return Err(FetchError::Api {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("{} parse error: {}", endpoint, e);
            FetchError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl WeatherFetcher for OpenWeatherClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch_current(&self, coordinate: Coordinate) -> Result<CurrentWeather, FetchError> {
        let body: owm::CurrentResponse = self.get_json("weather", coordinate).await?;
        Ok(body.into())
    }

    #[instrument(skip(self), level = "info")]
    async fn fetch_forecast(
        &self,
        coordinate: Coordinate,
    ) -> Result<Vec<ForecastEntry>, FetchError> {
        let body: owm::ForecastResponse = self.get_json("forecast", coordinate).await?;

        let mut entries = body
            .list
            .into_iter()
            .map(ForecastEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        // stable: equal timestamps keep service order
        entries.sort_by_key(|e| e.timestamp);

        tracing::info!("Fetched {} forecast slots", entries.len());
        Ok(entries)
    }
}

/// OpenWeatherMap 2.5 response shapes
mod owm {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Main {
        pub temp: f64,
        pub feels_like: f64,
        pub temp_min: f64,
        pub temp_max: f64,
        pub pressure: f64,
        pub humidity: f64,
        pub sea_level: Option<f64>,
        pub grnd_level: Option<f64>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Condition {
        pub id: i64,
        #[serde(default)]
        pub main: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentResponse {
        #[serde(default)]
        pub name: String,
        pub main: Main,
        #[serde(default)]
        pub weather: Vec<Condition>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastItem {
        pub dt: i64,
        pub main: Main,
        #[serde(default)]
        pub weather: Vec<Condition>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub list: Vec<ForecastItem>,
    }
}

impl From<owm::Main> for MainMetrics {
    fn from(m: owm::Main) -> Self {
        Self {
            temp: m.temp,
            feels_like: m.feels_like,
            temp_min: m.temp_min,
            temp_max: m.temp_max,
            pressure: m.pressure,
            humidity: m.humidity,
            sea_level: m.sea_level,
            ground_level: m.grnd_level,
        }
    }
}

/// The first listed condition is the primary one.
fn primary_condition(conditions: &[owm::Condition]) -> ConditionCode {
    conditions
        .first()
        .map(|c| ConditionCode::from_owm(c.id, &c.main))
        .unwrap_or_default()
}

impl From<owm::CurrentResponse> for CurrentWeather {
    fn from(r: owm::CurrentResponse) -> Self {
        Self {
            condition: primary_condition(&r.weather),
            location_name: r.name,
            metrics: r.main.into(),
        }
    }
}

impl TryFrom<owm::ForecastItem> for ForecastEntry {
    type Error = FetchError;

    fn try_from(item: owm::ForecastItem) -> Result<Self, Self::Error> {
        let timestamp = DateTime::from_timestamp(item.dt, 0)
            .ok_or_else(|| FetchError::Parse(format!("timestamp {} out of range", item.dt)))?;
        Ok(Self {
            timestamp,
            condition: primary_condition(&item.weather),
            metrics: item.main.into(),
        })
    }
}
