//! Estimation flow
//!
//! One user-triggered estimation resolves both endpoints, reads the traffic
//! and weather propositions, fetches a single route, computes the ETA and
//! publishes the result to the shared [`DisplayBoard`]. Every request takes a
//! generation ticket; only the most recently started request may publish, so
//! a slow earlier request can never overwrite a newer result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{MapConfig, TravelEtaConfig};
use crate::eta::{EtaCalculator, EtaResult};
use crate::location_resolver::CoordinateResolver;
use crate::map::{DeviceLocator, IpGeolocator, LeafletPresenter, MapPresenter, MapScene};
use crate::models::{Coordinate, ResolvedPoint};
use crate::routing::{OsrmClient, RouteProvider};
use crate::traffic::{TrafficEstimator, TrafficState};
use crate::weather::{OpenWeatherClient, WeatherEstimator, WeatherState};
use crate::Result;

pub const START_POPUP: &str = "Inicio";
pub const END_POPUP: &str = "Destino";

/// Per-request values threaded through the flow
#[derive(Debug, Clone)]
struct EstimationContext {
    now: DateTime<Tz>,
    start: ResolvedPoint,
    end: ResolvedPoint,
    traffic: TrafficState,
    weather: WeatherState,
}

/// Everything one estimation produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteReport {
    pub requested_at: DateTime<FixedOffset>,
    pub start: ResolvedPoint,
    pub end: ResolvedPoint,
    pub traffic: TrafficState,
    pub weather: WeatherState,
    pub eta: EtaResult,
    /// Route geometry in (lat, lon) order
    pub path: Vec<Coordinate>,
    pub time_text: String,
    pub distance_text: String,
    pub weather_text: String,
}

impl RouteReport {
    fn new(context: EstimationContext, eta: EtaResult, path: Vec<Coordinate>) -> Self {
        Self {
            requested_at: context.now.fixed_offset(),
            time_text: eta.time_text(),
            distance_text: eta.distance_text(),
            weather_text: context.weather.display_text(),
            start: context.start,
            end: context.end,
            traffic: context.traffic,
            weather: context.weather,
            eta,
            path,
        }
    }
}

/// The output regions and map, as last published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub generation: u64,
    pub time_text: String,
    pub distance_text: String,
    pub weather_text: String,
    pub scene: MapScene,
}

/// Shared display state guarded by request generations
#[derive(Debug, Default)]
pub struct DisplayBoard {
    latest: AtomicU64,
    state: RwLock<Option<BoardSnapshot>>,
}

impl DisplayBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request; any older request loses the right to publish
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }

    /// Write `snapshot` if `generation` is still the latest request
    pub fn publish(&self, generation: u64, snapshot: BoardSnapshot) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(generation) {
            return false;
        }
        *state = Some(snapshot);
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<BoardSnapshot> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The report was written to the display board
    Published(RouteReport),
    /// A newer request started while this one was pending; nothing was written
    Superseded(RouteReport),
}

impl RunOutcome {
    #[must_use]
    pub fn report(&self) -> &RouteReport {
        match self {
            RunOutcome::Published(report) | RunOutcome::Superseded(report) => report,
        }
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, RunOutcome::Published(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestNode {
    pub label: String,
    pub distance_km: f64,
}

/// Result of the "use current device location" action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceFix {
    pub coordinate: Coordinate,
    /// Text for the start input field
    pub start_text: String,
    pub nearest: Option<NearestNode>,
}

pub struct EtaPlanner {
    resolver: CoordinateResolver,
    traffic: TrafficEstimator,
    weather: WeatherEstimator,
    router: Arc<dyn RouteProvider>,
    calculator: EtaCalculator,
    timezone: Tz,
    map: MapConfig,
    locator: Option<Arc<dyn DeviceLocator>>,
    board: Arc<DisplayBoard>,
}

impl EtaPlanner {
    pub fn new(
        resolver: CoordinateResolver,
        weather: WeatherEstimator,
        router: Arc<dyn RouteProvider>,
    ) -> Self {
        Self {
            resolver,
            traffic: TrafficEstimator::default(),
            weather,
            router,
            calculator: EtaCalculator::default(),
            timezone: chrono_tz::America::Lima,
            map: MapConfig::default(),
            locator: None,
            board: Arc::new(DisplayBoard::new()),
        }
    }

    /// Wire the real OpenWeatherMap, OSRM and IP geolocation clients
    pub fn from_config(config: &TravelEtaConfig) -> Result<Self> {
        let weather = WeatherEstimator::new(
            Arc::new(OpenWeatherClient::new(&config.weather)?),
            config.weather.city_id.clone(),
        );
        let router = Arc::new(OsrmClient::new(&config.routing)?);

        let mut planner = Self::new(config.resolver(), weather, router)
            .with_traffic(config.traffic.estimator()?)
            .with_timezone(config.traffic.timezone()?)
            .with_calculator(EtaCalculator::new(config.estimator.average_speed_kmh)?)
            .with_map(config.map.clone());

        if config.geolocation.enabled {
            planner = planner.with_locator(Arc::new(IpGeolocator::new(&config.geolocation)?));
        }

        if config.weather.api_key.is_none() {
            warn!("No weather API key configured; weather will be reported as unknown");
        }

        Ok(planner)
    }

    #[must_use]
    pub fn with_traffic(mut self, traffic: TrafficEstimator) -> Self {
        self.traffic = traffic;
        self
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    #[must_use]
    pub fn with_calculator(mut self, calculator: EtaCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    #[must_use]
    pub fn with_map(mut self, map: MapConfig) -> Self {
        self.map = map;
        self
    }

    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn DeviceLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &CoordinateResolver {
        &self.resolver
    }

    #[must_use]
    pub fn board(&self) -> &Arc<DisplayBoard> {
        &self.board
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current wall-clock time in the map's timezone
    #[must_use]
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    /// Base map without any route
    #[must_use]
    pub fn empty_scene(&self) -> MapScene {
        MapScene::new(&self.map)
    }

    pub async fn estimate(&self, start: &str, end: &str) -> Result<RouteReport> {
        self.estimate_at(start, end, self.now()).await
    }

    /// Run the estimation flow for `now` without touching the display board.
    /// Invalid labels fail before any remote call is made.
    pub async fn estimate_at(&self, start: &str, end: &str, now: DateTime<Tz>) -> Result<RouteReport> {
        let (start, end) = self.resolver.resolve_pair(start, end)?;
        self.estimate_resolved(start, end, now).await
    }

    async fn estimate_resolved(
        &self,
        start: ResolvedPoint,
        end: ResolvedPoint,
        now: DateTime<Tz>,
    ) -> Result<RouteReport> {
        let traffic = self.traffic.current_traffic_state(&now);
        let weather = self.weather.current_weather_state().await;
        let context = EstimationContext {
            now,
            start,
            end,
            traffic,
            weather,
        };
        debug!(
            "Estimating {} -> {} with {:?}, {:?}",
            context.start.label, context.end.label, context.traffic, context.weather
        );

        let route = self
            .router
            .route(&context.start.coordinate, &context.end.coordinate)
            .await?;

        let eta = self
            .calculator
            .estimate(route.distance_km, &context.traffic, &context.weather)?;

        Ok(RouteReport::new(context, eta, route.geometry))
    }

    /// Draw the route and both endpoint markers
    pub fn render<P: MapPresenter>(&self, report: &RouteReport, presenter: &mut P) {
        if !report.path.is_empty() {
            presenter.draw_path(&report.path);
        }
        presenter.place_marker(report.start.coordinate, START_POPUP);
        presenter.place_marker(report.end.coordinate, END_POPUP);
    }

    pub async fn run(&self, start: &str, end: &str) -> Result<RunOutcome> {
        self.run_at(start, end, self.now()).await
    }

    /// Estimate and publish to the display board unless a newer request
    /// started in the meantime. Failures leave the board untouched.
    /// Rejected labels never take a generation, so they cannot supersede
    /// a request in flight.
    pub async fn run_at(&self, start: &str, end: &str, now: DateTime<Tz>) -> Result<RunOutcome> {
        let (start, end) = self.resolver.resolve_pair(start, end)?;
        let generation = self.board.begin();

        let report = self
            .estimate_resolved(start, end, now)
            .await
            .inspect_err(|e| warn!("Estimation request {} failed: {}", generation, e))?;

        let mut presenter = LeafletPresenter::new(self.empty_scene(), self.locator.clone());
        self.render(&report, &mut presenter);

        let snapshot = BoardSnapshot {
            generation,
            time_text: report.time_text.clone(),
            distance_text: report.distance_text.clone(),
            weather_text: report.weather_text.clone(),
            scene: presenter.into_scene(),
        };

        if self.board.publish(generation, snapshot) {
            info!(
                "{} -> {}: {:.2} km, x{}, {:.2} min ({})",
                report.start.label,
                report.end.label,
                report.eta.distance_km,
                report.eta.multiplier,
                report.eta.minutes,
                report.weather.label()
            );
            Ok(RunOutcome::Published(report))
        } else {
            debug!("Estimation request {} superseded by a newer request", generation);
            Ok(RunOutcome::Superseded(report))
        }
    }

    /// Read the device position for the start field
    pub async fn locate_device(&self) -> Result<DeviceFix> {
        let presenter = LeafletPresenter::new(self.empty_scene(), self.locator.clone());
        let coordinate = presenter.current_device_location().await.map_err(|e| {
            warn!("Could not obtain device location: {}", e);
            e
        })?;

        let nearest = self.resolver.nearest(&coordinate).map(|(label, distance_km)| NearestNode {
            label: label.to_string(),
            distance_km,
        });

        Ok(DeviceFix {
            coordinate,
            start_text: coordinate.format_literal(),
            nearest,
        })
    }
}
