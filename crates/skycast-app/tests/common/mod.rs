//! Test doubles for driving the controller without a device or network.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use skycast_weather::{
    AccuracyHint, ConditionCode, Coordinate, CurrentWeather, FetchError, ForecastEntry,
    GeoLocationProvider, LocationError, MainMetrics, PermissionStatus,
};
use tokio::sync::Notify;

/// Reference instant used by test controllers
pub fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
}

pub fn metrics(temp: f64) -> MainMetrics {
    MainMetrics {
        temp,
        feels_like: temp,
        temp_min: temp,
        temp_max: temp,
        pressure: 1012.0,
        humidity: 75.0,
        sea_level: None,
        ground_level: None,
    }
}

/// Five days of 3-hourly slots starting at midnight UTC on 2024-01-10
pub fn forecast() -> Vec<ForecastEntry> {
    let start = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
    (0..40)
        .map(|i| ForecastEntry {
            timestamp: start + chrono::Duration::hours(3 * i),
            metrics: metrics(i as f64),
            condition: ConditionCode::Clouds,
        })
        .collect()
}

/// Location service with a scripted answer
pub struct FakeLocator {
    pub permission: PermissionStatus,
    pub result: Option<Result<Coordinate, LocationError>>,
    pub acquire_calls: AtomicUsize,
}

impl FakeLocator {
    pub fn fixed(coordinate: Coordinate) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            result: Some(Ok(coordinate)),
            acquire_calls: AtomicUsize::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            result: Some(Err(LocationError::PermissionDenied)),
            acquire_calls: AtomicUsize::new(0),
        }
    }

    /// Never produces a fix
    pub fn silent() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            result: None,
            acquire_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GeoLocationProvider for FakeLocator {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn acquire_coordinate(
        &self,
        _accuracy: AccuracyHint,
        _timeout: Duration,
    ) -> Result<Coordinate, LocationError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Some(result) => result.clone(),
            None => std::future::pending().await,
        }
    }
}

/// Weather fetcher that names the location after the latitude and can hold
/// back one coordinate until released.
#[derive(Default)]
pub struct GatedFetcher {
    pub gate: Option<(f64, Arc<Notify>)>,
    pub forecast_error: Option<FetchError>,
    pub current_calls: AtomicUsize,
    pub forecast_calls: AtomicUsize,
    pub completed: AtomicUsize,
}

impl GatedFetcher {
    pub fn holding(latitude: f64, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some((latitude, gate)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst) + self.forecast_calls.load(Ordering::SeqCst)
    }
}

pub fn name_for(coordinate: Coordinate) -> String {
    format!("lat {}", coordinate.latitude)
}

#[async_trait]
impl skycast_weather::WeatherFetcher for GatedFetcher {
    async fn fetch_current(&self, coordinate: Coordinate) -> Result<CurrentWeather, FetchError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((latitude, gate)) = &self.gate {
            if *latitude == coordinate.latitude {
                gate.notified().await;
            }
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(CurrentWeather {
            location_name: name_for(coordinate),
            metrics: metrics(2.5),
            condition: ConditionCode::Rain,
        })
    }

    async fn fetch_forecast(
        &self,
        _coordinate: Coordinate,
    ) -> Result<Vec<ForecastEntry>, FetchError> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        match &self.forecast_error {
            Some(e) => Err(e.clone()),
            None => Ok(forecast()),
        }
    }
}
