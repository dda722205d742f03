//! Coordinate acquisition: device location service and manual entry.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LocationError;
use crate::types::Coordinate;

/// Outcome of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Requested fix accuracy, coarsest to finest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyHint {
    Lowest,
    Low,
    #[default]
    Balanced,
    High,
    Highest,
}

/// A source of device coordinates.
#[async_trait]
pub trait GeoLocationProvider: Send + Sync {
    /// Ask for permission to use the location service.
    async fn request_permission(&self) -> PermissionStatus;

    /// Produce a fix. Fails with `PermissionDenied` when permission is not
    /// granted and `LocationUnavailable` when no fix can be made.
    async fn acquire_coordinate(
        &self,
        accuracy: AccuracyHint,
        timeout: Duration,
    ) -> Result<Coordinate, LocationError>;
}

/// Acquire a coordinate, failing with `LocationUnavailable` once `timeout` elapses.
pub async fn acquire_with_timeout(
    provider: &dyn GeoLocationProvider,
    accuracy: AccuracyHint,
    timeout: Duration,
) -> Result<Coordinate, LocationError> {
    match tokio::time::timeout(timeout, provider.acquire_coordinate(accuracy, timeout)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("No location fix within {:?}", timeout);
            Err(LocationError::LocationUnavailable)
        }
    }
}

/// Request permission, then acquire a fix.
pub async fn locate(
    provider: &dyn GeoLocationProvider,
    accuracy: AccuracyHint,
    timeout: Duration,
) -> Result<Coordinate, LocationError> {
    if provider.request_permission().await == PermissionStatus::Denied {
        tracing::info!("Location permission denied");
        return Err(LocationError::PermissionDenied);
    }
    acquire_with_timeout(provider, accuracy, timeout).await
}

/// Parse user-entered latitude/longitude text.
///
/// Empty, non-numeric and non-finite input is rejected so a NaN coordinate can
/// never reach the controller.
pub fn parse_manual_coordinate(
    lat_text: &str,
    lon_text: &str,
) -> Result<Coordinate, LocationError> {
    let latitude = parse_component("latitude", lat_text)?;
    let longitude = parse_component("longitude", lon_text)?;
    Coordinate::new(latitude, longitude)
}

fn parse_component(name: &str, text: &str) -> Result<f64, LocationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(LocationError::InvalidInput(format!("{name} is empty")));
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(LocationError::InvalidInput(format!(
            "{name} '{trimmed}' is not a number"
        ))),
    }
}

/// Location service backed by configuration.
///
/// Stands in for the OS service on machines without one: it reports whatever
/// coordinate it was given.
#[derive(Debug, Clone)]
pub struct ConfiguredLocationProvider {
    coordinate: Option<Coordinate>,
    permission: PermissionStatus,
}

impl ConfiguredLocationProvider {
    pub fn new(coordinate: Option<Coordinate>, permission: PermissionStatus) -> Self {
        Self {
            coordinate,
            permission,
        }
    }
}

#[async_trait]
impl GeoLocationProvider for ConfiguredLocationProvider {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn acquire_coordinate(
        &self,
        accuracy: AccuracyHint,
        _timeout: Duration,
    ) -> Result<Coordinate, LocationError> {
        if self.permission == PermissionStatus::Denied {
            return Err(LocationError::PermissionDenied);
        }
        match self.coordinate {
            Some(c) => {
                tracing::debug!("Configured location {} ({:?})", c, accuracy);
                Ok(c)
            }
            None => Err(LocationError::LocationUnavailable),
        }
    }
}
