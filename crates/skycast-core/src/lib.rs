pub mod config;
pub mod error;

pub use config::{
    AccuracyLevel, Config, ForecastConfig, LocationConfig, LoggingConfig, ValidationResult,
    WeatherConfig,
};
pub use error::{AppError, ConfigError, LocationError, NetworkError, WeatherError};

use anyhow::Result;

/// Environment variable holding the weather service API key.
pub const API_KEY_ENV: &str = "SKYCAST_API_KEY";

/// Environment variable overriding the weather service base URL.
pub const BASE_URL_ENV: &str = "SKYCAST_BASE_URL";

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins over `default_level`. Safe to call more than once.
pub fn init(default_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        tracing::info!("SkyCast core initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        assert!(init("debug").is_ok());
        assert!(init("info").is_ok());
    }
}
