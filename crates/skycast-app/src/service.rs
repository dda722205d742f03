//! Background weather work.
//!
//! Location and network calls run on the tokio runtime; results come back to
//! the owning thread as [`WeatherServiceMessage`]s tagged with the generation
//! that requested them.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use skycast_weather::{
    locate, AccuracyHint, Coordinate, CurrentWeather, FetchError, ForecastEntry,
    GeoLocationProvider, LocationError, WeatherFetcher,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Both halves of one fetch cycle
#[derive(Debug, Clone, PartialEq)]
pub struct FetchBundle {
    pub current: CurrentWeather,
    pub forecast: Vec<ForecastEntry>,
}

/// Messages sent from async operations back to the owning thread
#[derive(Debug)]
pub enum WeatherServiceMessage {
    /// Result of requesting permission and a device fix
    LocationDone {
        generation: u64,
        result: Result<Coordinate, LocationError>,
    },
    /// Result of fetching current weather and forecast for one coordinate
    FetchDone {
        generation: u64,
        coordinate: Coordinate,
        result: Result<FetchBundle, FetchError>,
    },
}

impl WeatherServiceMessage {
    pub fn generation(&self) -> u64 {
        match self {
            Self::LocationDone { generation, .. } | Self::FetchDone { generation, .. } => {
                *generation
            }
        }
    }
}

/// Request a device coordinate asynchronously.
/// Sends `LocationDone` on the channel when complete.
pub fn request_location(
    tx: &Sender<WeatherServiceMessage>,
    runtime: &Handle,
    provider: Arc<dyn GeoLocationProvider>,
    generation: u64,
    accuracy: AccuracyHint,
    timeout: Duration,
) -> JoinHandle<()> {
    let tx = tx.clone();
    runtime.spawn(async move {
        let result = locate(provider.as_ref(), accuracy, timeout).await;
        match &result {
            Ok(coordinate) => tracing::info!("Got location: {}", coordinate),
            Err(e) => tracing::warn!("Location request failed: {}", e),
        }
        // Receiver gone means the controller was dropped
        let _ = tx.send(WeatherServiceMessage::LocationDone { generation, result });
    })
}

/// Fetch current weather and forecast concurrently.
///
/// Sends a single `FetchDone` once both calls have settled. The cycle is
/// all-or-nothing: either failure fails the whole bundle, the current-weather
/// error taking precedence.
pub fn request_fetch(
    tx: &Sender<WeatherServiceMessage>,
    runtime: &Handle,
    fetcher: Arc<dyn WeatherFetcher>,
    generation: u64,
    coordinate: Coordinate,
) -> JoinHandle<()> {
    let tx = tx.clone();
    runtime.spawn(async move {
        let (current, forecast) = tokio::join!(
            fetcher.fetch_current(coordinate),
            fetcher.fetch_forecast(coordinate)
        );

        let result = match (current, forecast) {
            (Ok(current), Ok(forecast)) => Ok(FetchBundle { current, forecast }),
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        };

        if let Err(e) = &result {
            tracing::warn!("Weather fetch for {} failed: {}", coordinate, e);
        }
        let _ = tx.send(WeatherServiceMessage::FetchDone {
            generation,
            coordinate,
            result,
        });
    })
}
