//! Weather-domain error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable")]
    LocationUnavailable,
    #[error("Invalid coordinate input: {0}")]
    InvalidInput(String),
}

/// Weather fetch errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: HTTP {status}")]
    Api { status: u16 },
    #[error("No API key configured")]
    MissingApiKey,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}

/// Why a fetch cycle ended without data.
///
/// This is what the controller stores; it never carries vendor payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable")]
    LocationUnavailable,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: HTTP {0}")]
    Api(u16),
}

impl FailureReason {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "No permissions for location service!",
            Self::LocationUnavailable => {
                "Your location could not be determined. Enter coordinates manually."
            }
            Self::InvalidInput(_) => "Latitude and longitude must be numbers.",
            Self::Network(_) => "Network error. Check your connection.",
            Self::Parse(_) => "The weather service sent an unexpected response.",
            Self::Api(401) => "Weather API key is invalid. Check settings.",
            Self::Api(429) => "Too many requests. Please wait and try again.",
            Self::Api(status) if *status >= 500 => {
                "Weather service unavailable. Please try again later."
            }
            Self::Api(_) => "Weather service error. Please try again.",
        }
    }
}

impl From<LocationError> for FailureReason {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::PermissionDenied => Self::PermissionDenied,
            LocationError::LocationUnavailable => Self::LocationUnavailable,
            LocationError::InvalidInput(msg) => Self::InvalidInput(msg),
        }
    }
}

impl From<FetchError> for FailureReason {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Network(msg) => Self::Network(msg),
            FetchError::Parse(msg) => Self::Parse(msg),
            FetchError::Api { status } => Self::Api(status),
            // What the service answers when the key is absent
            FetchError::MissingApiKey => Self::Api(401),
        }
    }
}
