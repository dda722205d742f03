//! Maps controller failures to skycast_core::AppError for consistent user-facing messages.

use skycast_core::{AppError, LocationError, NetworkError, WeatherError};
use skycast_weather::FailureReason;

/// Application error for a failed fetch cycle
pub fn app_error(reason: FailureReason) -> AppError {
    match reason {
        FailureReason::PermissionDenied => AppError::Location(LocationError::PermissionDenied),
        FailureReason::LocationUnavailable => AppError::Location(LocationError::Unavailable),
        FailureReason::InvalidInput(s) => AppError::Location(LocationError::InvalidInput(s)),
        FailureReason::Network(s) => AppError::Network(NetworkError::ConnectionFailed(s)),
        FailureReason::Parse(s) => AppError::Network(NetworkError::InvalidResponse(s)),
        FailureReason::Api(401) => AppError::Weather(WeatherError::InvalidApiKey),
        FailureReason::Api(status) if status >= 500 => {
            AppError::Weather(WeatherError::ServiceUnavailable)
        }
        FailureReason::Api(status) => {
            AppError::Weather(WeatherError::ApiError(format!("HTTP {status}")))
        }
    }
}

/// Application error for rejected location input
pub fn location_app_error(e: skycast_weather::LocationError) -> AppError {
    app_error(FailureReason::from(e))
}
