use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use skycast_app::error_mapping::{app_error, location_app_error};
use skycast_app::{report, ControllerOptions, ControllerState, WeatherController};
use skycast_core::{AccuracyLevel, AppError, Config, ConfigError, API_KEY_ENV};
use skycast_weather::{
    AccuracyHint, ConfiguredLocationProvider, Coordinate, OpenWeatherClient, PermissionStatus,
    RetryConfig, SelectionWindow,
};

#[derive(Parser, Debug)]
#[command(name = "skycast", version, about = "Current weather and midday forecast")]
struct Cli {
    /// Latitude for a manual coordinate (requires --lon)
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<String>,

    /// Longitude for a manual coordinate (requires --lat)
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, env = "SKYCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Give up if no result arrives in this many seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn accuracy_hint(level: AccuracyLevel) -> AccuracyHint {
    match level {
        AccuracyLevel::Lowest => AccuracyHint::Lowest,
        AccuracyLevel::Low => AccuracyHint::Low,
        AccuracyLevel::Balanced => AccuracyHint::Balanced,
        AccuracyLevel::High => AccuracyHint::High,
        AccuracyLevel::Highest => AccuracyHint::Highest,
    }
}

fn location_provider(config: &Config) -> ConfiguredLocationProvider {
    let coordinate = match (config.location.latitude, config.location.longitude) {
        (Some(lat), Some(lon)) => Coordinate::new(lat, lon).ok(),
        _ => None,
    };
    let permission = if config.location.permission_granted {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    };
    ConfiguredLocationProvider::new(coordinate, permission)
}

fn weather_client(config: &Config) -> Result<OpenWeatherClient> {
    let api_key = config.api_key().ok_or_else(|| {
        AppError::Config(ConfigError::MissingSetting(format!(
            "weather.api_key (or {API_KEY_ENV})"
        )))
    })?;
    let retry = RetryConfig {
        max_retries: config.weather.max_retries,
        ..RetryConfig::default()
    };
    let client = OpenWeatherClient::with_options(
        &config.weather.base_url,
        api_key,
        Duration::from_secs(config.weather.timeout_secs),
        retry,
    )?;
    Ok(client)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, validation) = Config::load_validated(cli.config.as_deref())?;
    skycast_core::init(&config.logging.level)?;
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("skycast-tokio")
        .build()
        .context("Failed to build tokio runtime")?;

    let options = ControllerOptions {
        accuracy: accuracy_hint(config.location.accuracy),
        location_timeout: Duration::from_millis(config.location.timeout_ms),
        window: SelectionWindow {
            days_ahead: config.forecast.days_ahead,
            hour_of_day: config.forecast.hour_of_day,
            max_entries: config.forecast.max_entries,
        },
        abort_superseded: true,
    };

    let mut controller = WeatherController::new(
        Arc::new(location_provider(&config)),
        Arc::new(weather_client(&config)?),
        runtime.handle().clone(),
        options,
    );

    tracing::info!("SkyCast started");

    match (&cli.lat, &cli.lon) {
        (Some(lat), Some(lon)) => {
            controller
                .submit_manual_coordinate(lat, lon)
                .map_err(location_app_error)?;
        }
        _ => controller.start(),
    }

    if !controller.wait_for_settled(Duration::from_secs(cli.timeout_secs)) {
        anyhow::bail!("No weather within {} seconds", cli.timeout_secs);
    }

    match controller.state() {
        ControllerState::Ready { current, summary } => {
            print!("{}", report::render(current, summary, &chrono::Local));
            Ok(())
        }
        ControllerState::FetchFailed(reason) => {
            eprintln!("{}", reason.user_message());
            Err(app_error(reason.clone()).into())
        }
        other => anyhow::bail!("Unexpected state {}", other.name()),
    }
}
