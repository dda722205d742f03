//! Weather orchestration.
//!
//! [`WeatherController`] owns the state machine. Commands run on the owning
//! thread and only spawn background work; completions are applied when the
//! owner drains the channel. Every accepted coordinate and every location
//! request starts a new generation, and completions from any other generation
//! are discarded.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone};
use skycast_weather::{
    parse_manual_coordinate, AccuracyHint, Coordinate, FailureReason, GeoLocationProvider,
    LocationError, SelectionWindow, Summary, WeatherFetcher,
};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::service::{self, WeatherServiceMessage};
use crate::state::{ControllerState, WeatherView};

/// Tunables for a controller
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub accuracy: AccuracyHint,
    /// Upper bound on waiting for a device fix
    pub location_timeout: Duration,
    pub window: SelectionWindow,
    /// Abort background work once its generation is superseded
    pub abort_superseded: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            accuracy: AccuracyHint::Balanced,
            location_timeout: Duration::from_millis(3000),
            window: SelectionWindow::default(),
            abort_superseded: true,
        }
    }
}

type Clock<Tz> = Box<dyn Fn() -> DateTime<Tz> + Send>;

pub struct WeatherController<Tz: TimeZone = Local> {
    locator: Arc<dyn GeoLocationProvider>,
    fetcher: Arc<dyn WeatherFetcher>,
    runtime: Handle,
    options: ControllerOptions,
    clock: Clock<Tz>,

    state: ControllerState,
    generation: u64,
    coordinate: Option<Coordinate>,
    in_flight: Option<JoinHandle<()>>,

    tx: Sender<WeatherServiceMessage>,
    rx: Receiver<WeatherServiceMessage>,
    view_tx: watch::Sender<WeatherView>,
}

impl WeatherController<Local> {
    /// Controller that computes summaries against the local time zone
    pub fn new(
        locator: Arc<dyn GeoLocationProvider>,
        fetcher: Arc<dyn WeatherFetcher>,
        runtime: Handle,
        options: ControllerOptions,
    ) -> Self {
        Self::with_clock(locator, fetcher, runtime, options, Local::now)
    }
}

impl<Tz: TimeZone> WeatherController<Tz> {
    /// Controller whose summary reference time comes from `clock`
    pub fn with_clock(
        locator: Arc<dyn GeoLocationProvider>,
        fetcher: Arc<dyn WeatherFetcher>,
        runtime: Handle,
        options: ControllerOptions,
        clock: impl Fn() -> DateTime<Tz> + Send + 'static,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let (view_tx, _) = watch::channel(WeatherView::default());
        Self {
            locator,
            fetcher,
            runtime,
            options,
            clock: Box::new(clock),
            state: ControllerState::Idle,
            generation: 0,
            coordinate: None,
            in_flight: None,
            tx,
            rx,
            view_tx,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Coordinate of the active generation, if one has been accepted
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn view(&self) -> WeatherView {
        WeatherView::from_state(&self.state, self.generation, self.coordinate)
    }

    /// Receive a snapshot after every transition
    pub fn subscribe(&self) -> watch::Receiver<WeatherView> {
        self.view_tx.subscribe()
    }

    /// Leave `Idle` by acquiring the device location. No-op in any other state.
    pub fn start(&mut self) {
        if self.state == ControllerState::Idle {
            self.refresh_location();
        } else {
            tracing::debug!("start ignored in state {}", self.state.name());
        }
    }

    /// Re-acquire the device location from any state.
    ///
    /// Returns the generation of the new request.
    pub fn refresh_location(&mut self) -> u64 {
        let generation = self.next_generation();
        self.coordinate = None;
        self.transition(ControllerState::AcquiringLocation);

        tracing::info!("Requesting device location (generation {})", generation);
        self.in_flight = Some(service::request_location(
            &self.tx,
            &self.runtime,
            Arc::clone(&self.locator),
            generation,
            self.options.accuracy,
            self.options.location_timeout,
        ));
        generation
    }

    /// Parse and accept a user-entered coordinate.
    ///
    /// Invalid input leaves the state untouched and starts no fetch.
    pub fn submit_manual_coordinate(
        &mut self,
        lat_text: &str,
        lon_text: &str,
    ) -> Result<u64, LocationError> {
        match parse_manual_coordinate(lat_text, lon_text) {
            Ok(coordinate) => Ok(self.submit_coordinate(coordinate)),
            Err(e) => {
                tracing::warn!("Rejected manual coordinate: {}", e);
                Err(e)
            }
        }
    }

    /// Accept a coordinate and fetch weather for it, superseding any
    /// outstanding work. Returns the new generation.
    pub fn submit_coordinate(&mut self, coordinate: Coordinate) -> u64 {
        self.begin_fetch(coordinate)
    }

    /// Apply every completion that has arrived so far without blocking.
    ///
    /// Returns how many messages were drained, stale ones included.
    pub fn poll_channel(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
            drained += 1;
        }
        drained
    }

    /// Block until the state stops loading or `timeout` passes.
    ///
    /// A timeout too large to represent as a deadline waits indefinitely.
    /// Returns whether the state settled.
    pub fn wait_for_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        self.poll_channel();

        while !self.state.is_settled() {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.rx.recv_timeout(remaining)
                }
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(message) => self.handle_message(message),
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "Still {} after {:?} (generation {})",
                        self.state.name(),
                        timeout,
                        self.generation
                    );
                    return false;
                }
                // Unreachable while we hold `tx`
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    fn handle_message(&mut self, message: WeatherServiceMessage) {
        let generation = message.generation();
        if generation != self.generation {
            tracing::debug!(
                "Discarding stale result for generation {} (active {})",
                generation,
                self.generation
            );
            return;
        }
        self.in_flight = None;

        match message {
            WeatherServiceMessage::LocationDone { result, .. } => match result {
                Ok(coordinate) => {
                    self.begin_fetch(coordinate);
                }
                Err(e) => self.fail(e.into()),
            },
            WeatherServiceMessage::FetchDone {
                coordinate, result, ..
            } => match result {
                Ok(bundle) => {
                    let reference = (self.clock)();
                    let summary =
                        Summary::from_forecast(&bundle.forecast, &reference, &self.options.window);
                    tracing::info!(
                        "Weather ready for {} ({}, {} forecast slots, {} selected)",
                        coordinate,
                        bundle.current.location_name,
                        bundle.forecast.len(),
                        summary.len()
                    );
                    self.transition(ControllerState::Ready {
                        current: bundle.current,
                        summary,
                    });
                }
                Err(e) => self.fail(e.into()),
            },
        }
    }

    fn begin_fetch(&mut self, coordinate: Coordinate) -> u64 {
        let generation = self.next_generation();
        self.coordinate = Some(coordinate);
        self.transition(ControllerState::Fetching);

        tracing::info!("Fetching weather for {} (generation {})", coordinate, generation);
        self.in_flight = Some(service::request_fetch(
            &self.tx,
            &self.runtime,
            Arc::clone(&self.fetcher),
            generation,
            coordinate,
        ));
        generation
    }

    fn fail(&mut self, reason: FailureReason) {
        tracing::error!("Generation {} failed: {}", self.generation, reason);
        self.transition(ControllerState::FetchFailed(reason));
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        if let Some(handle) = self.in_flight.take() {
            if self.options.abort_superseded && !handle.is_finished() {
                tracing::debug!("Aborting superseded task");
                handle.abort();
            }
        }
        self.generation
    }

    fn transition(&mut self, next: ControllerState) {
        tracing::debug!(
            "{} -> {} (generation {})",
            self.state.name(),
            next.name(),
            self.generation
        );
        self.state = next;
        self.view_tx.send_replace(self.view());
    }
}

impl<Tz: TimeZone> Drop for WeatherController<Tz> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::FetchBundle;
    use crate::state::ViewStatus;
    use async_trait::async_trait;
    use chrono::Utc;
    use skycast_weather::{
        ConditionCode, ConfiguredLocationProvider, CurrentWeather, FetchError, ForecastEntry,
        MainMetrics, PermissionStatus,
    };

    struct Unreachable;

    #[async_trait]
    impl WeatherFetcher for Unreachable {
        async fn fetch_current(&self, _at: Coordinate) -> Result<CurrentWeather, FetchError> {
            std::future::pending().await
        }

        async fn fetch_forecast(&self, _at: Coordinate) -> Result<Vec<ForecastEntry>, FetchError> {
            std::future::pending().await
        }
    }

    fn metrics(temp: f64) -> MainMetrics {
        MainMetrics {
            temp,
            feels_like: temp,
            temp_min: temp,
            temp_max: temp,
            pressure: 1000.0,
            humidity: 50.0,
            sea_level: None,
            ground_level: None,
        }
    }

    fn bundle(name: &str) -> FetchBundle {
        let noon = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        FetchBundle {
            current: CurrentWeather {
                location_name: name.into(),
                metrics: metrics(3.0),
                condition: ConditionCode::Rain,
            },
            forecast: vec![ForecastEntry {
                timestamp: noon,
                metrics: metrics(5.0),
                condition: ConditionCode::Clear,
            }],
        }
    }

    fn controller(rt: &tokio::runtime::Runtime) -> WeatherController<Utc> {
        let locator = ConfiguredLocationProvider::new(None, PermissionStatus::Granted);
        let options = ControllerOptions {
            abort_superseded: false,
            ..ControllerOptions::default()
        };
        let fixed = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        WeatherController::with_clock(
            Arc::new(locator),
            Arc::new(Unreachable),
            rt.handle().clone(),
            options,
            move || fixed,
        )
    }

    fn fetch_done(generation: u64, name: &str) -> WeatherServiceMessage {
        WeatherServiceMessage::FetchDone {
            generation,
            coordinate: Coordinate::new(1.0, 2.0).unwrap(),
            result: Ok(bundle(name)),
        }
    }

    #[test]
    fn test_starts_idle() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let c = controller(&rt);
        assert_eq!(c.state(), &ControllerState::Idle);
        assert_eq!(c.generation(), 0);
        assert_eq!(c.view().status, ViewStatus::Idle);
    }

    #[test]
    fn test_stale_fetch_is_discarded() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut c = controller(&rt);

        let old = c.submit_coordinate(Coordinate::new(10.0, 10.0).unwrap());
        let new = c.submit_coordinate(Coordinate::new(20.0, 20.0).unwrap());
        assert!(new > old);

        c.handle_message(fetch_done(new, "Newer"));
        c.handle_message(fetch_done(old, "Older"));

        match c.state() {
            ControllerState::Ready { current, summary } => {
                assert_eq!(current.location_name, "Newer");
                assert_eq!(summary.len(), 1);
                assert_eq!(
                    summary.reference_date,
                    chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
                );
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(c.coordinate(), Some(Coordinate::new(20.0, 20.0).unwrap()));
    }

    #[test]
    fn test_stale_failure_does_not_override_ready() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut c = controller(&rt);

        let old = c.submit_coordinate(Coordinate::new(10.0, 10.0).unwrap());
        let new = c.submit_coordinate(Coordinate::new(20.0, 20.0).unwrap());
        c.handle_message(fetch_done(new, "Newer"));
        c.handle_message(WeatherServiceMessage::FetchDone {
            generation: old,
            coordinate: Coordinate::new(10.0, 10.0).unwrap(),
            result: Err(FetchError::Api { status: 500 }),
        });

        assert!(matches!(c.state(), ControllerState::Ready { .. }));
    }

    #[test]
    fn test_stale_location_is_discarded() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut c = controller(&rt);

        let location_gen = c.refresh_location();
        let manual_gen = c.submit_coordinate(Coordinate::new(5.0, 5.0).unwrap());
        c.handle_message(WeatherServiceMessage::LocationDone {
            generation: location_gen,
            result: Err(LocationError::PermissionDenied),
        });

        assert_eq!(c.state(), &ControllerState::Fetching);
        assert_eq!(c.generation(), manual_gen);
    }

    #[test]
    fn test_location_fix_starts_a_new_fetch_generation() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut c = controller(&rt);

        let location_gen = c.refresh_location();
        assert_eq!(c.state(), &ControllerState::AcquiringLocation);
        assert_eq!(c.coordinate(), None);

        let coordinate = Coordinate::new(52.0, 21.0).unwrap();
        c.handle_message(WeatherServiceMessage::LocationDone {
            generation: location_gen,
            result: Ok(coordinate),
        });

        assert_eq!(c.state(), &ControllerState::Fetching);
        assert_eq!(c.generation(), location_gen + 1);
        assert_eq!(c.coordinate(), Some(coordinate));
    }

    #[test]
    fn test_new_generation_drops_ready_data() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut c = controller(&rt);

        let generation = c.submit_coordinate(Coordinate::new(1.0, 2.0).unwrap());
        c.handle_message(fetch_done(generation, "First"));
        assert_eq!(c.view().status, ViewStatus::Ready);

        c.refresh_location();
        let view = c.view();
        assert_eq!(view.status, ViewStatus::Loading);
        assert!(view.current.is_none());
        assert!(view.summary.is_none());
    }

    #[test]
    fn test_subscribers_see_transitions() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut c = controller(&rt);
        let mut rx = c.subscribe();

        let generation = c.submit_coordinate(Coordinate::new(1.0, 2.0).unwrap());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, ViewStatus::Loading);

        c.handle_message(WeatherServiceMessage::FetchDone {
            generation,
            coordinate: Coordinate::new(1.0, 2.0).unwrap(),
            result: Err(FetchError::Parse("truncated".into())),
        });
        let view = rx.borrow_and_update().clone();
        assert_eq!(view.status, ViewStatus::Error);
        assert_eq!(
            view.error.map(|e| e.reason),
            Some(FailureReason::Parse("truncated".into()))
        );
    }

    #[test]
    fn test_start_only_leaves_idle() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut c = controller(&rt);

        c.start();
        assert_eq!(c.generation(), 1);
        c.start();
        assert_eq!(c.generation(), 1);
    }

    #[test]
    fn test_wait_for_settled_accepts_unbounded_timeout() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let locator = ConfiguredLocationProvider::new(None, PermissionStatus::Denied);
        let mut c = WeatherController::with_clock(
            Arc::new(locator),
            Arc::new(Unreachable),
            rt.handle().clone(),
            ControllerOptions::default(),
            Utc::now,
        );

        c.start();
        assert!(c.wait_for_settled(Duration::MAX));
        assert!(c.wait_for_settled(Duration::from_secs(u64::MAX)));
        assert_eq!(
            c.state(),
            &ControllerState::FetchFailed(FailureReason::PermissionDenied)
        );
    }

    #[test]
    fn test_wait_for_settled_times_out() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut c = controller(&rt);

        c.submit_coordinate(Coordinate::new(1.0, 2.0).unwrap());
        assert!(!c.wait_for_settled(Duration::from_millis(50)));
        assert_eq!(c.state(), &ControllerState::Fetching);
    }
}
