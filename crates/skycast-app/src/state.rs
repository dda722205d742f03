//! Controller state and the snapshot handed to presentation layers.

use serde::Serialize;
use skycast_weather::{Coordinate, CurrentWeather, FailureReason, Summary};

/// Orchestration state machine
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ControllerState {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Waiting for permission and a device fix
    AcquiringLocation,
    /// Both weather calls outstanding for the active coordinate
    Fetching,
    Ready {
        current: CurrentWeather,
        summary: Summary,
    },
    FetchFailed(FailureReason),
}

impl ControllerState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AcquiringLocation => "acquiring_location",
            Self::Fetching => "fetching",
            Self::Ready { .. } => "ready",
            Self::FetchFailed(_) => "fetch_failed",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::AcquiringLocation | Self::Fetching)
    }

    /// No background work can move the state any more
    pub fn is_settled(&self) -> bool {
        !self.is_loading()
    }
}

/// Coarse status for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Failure as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewError {
    pub reason: FailureReason,
    pub message: String,
}

/// Snapshot of the controller published on every transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub status: ViewStatus,
    pub generation: u64,
    pub coordinate: Option<Coordinate>,
    pub current: Option<CurrentWeather>,
    pub summary: Option<Summary>,
    pub error: Option<ViewError>,
}

impl WeatherView {
    pub fn from_state(
        state: &ControllerState,
        generation: u64,
        coordinate: Option<Coordinate>,
    ) -> Self {
        let mut view = Self {
            status: ViewStatus::Idle,
            generation,
            coordinate,
            current: None,
            summary: None,
            error: None,
        };

        match state {
            ControllerState::Idle => {}
            ControllerState::AcquiringLocation | ControllerState::Fetching => {
                view.status = ViewStatus::Loading;
            }
            ControllerState::Ready { current, summary } => {
                view.status = ViewStatus::Ready;
                view.current = Some(current.clone());
                view.summary = Some(summary.clone());
            }
            ControllerState::FetchFailed(reason) => {
                view.status = ViewStatus::Error;
                view.error = Some(ViewError {
                    reason: reason.clone(),
                    message: reason.user_message().to_string(),
                });
            }
        }

        view
    }
}

impl Default for WeatherView {
    fn default() -> Self {
        Self::from_state(&ControllerState::Idle, 0, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_states() {
        assert!(ControllerState::AcquiringLocation.is_loading());
        assert!(ControllerState::Fetching.is_loading());
        assert!(ControllerState::Idle.is_settled());
        assert!(ControllerState::FetchFailed(FailureReason::LocationUnavailable).is_settled());
    }

    #[test]
    fn test_failed_view_has_no_data() {
        let view = WeatherView::from_state(
            &ControllerState::FetchFailed(FailureReason::PermissionDenied),
            4,
            None,
        );
        assert_eq!(view.status, ViewStatus::Error);
        assert_eq!(view.generation, 4);
        assert!(view.current.is_none());
        assert!(view.summary.is_none());
        let error = view.error.unwrap();
        assert_eq!(error.reason, FailureReason::PermissionDenied);
        assert!(error.message.contains("permissions"));
    }

    #[test]
    fn test_view_serializes_status() {
        let json = serde_json::to_value(WeatherView::default()).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["generation"], 0);
        assert!(json["error"].is_null());
    }
}
