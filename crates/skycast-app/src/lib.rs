//! SkyCast application layer
//!
//! The orchestration controller, its background service requests and the
//! terminal report.

pub mod controller;
pub mod error_mapping;
pub mod report;
pub mod service;
pub mod state;

pub use controller::{ControllerOptions, WeatherController};
pub use service::{FetchBundle, WeatherServiceMessage};
pub use state::{ControllerState, ViewError, ViewStatus, WeatherView};
