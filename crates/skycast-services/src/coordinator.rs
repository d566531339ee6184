//! City activation and prediction orchestration.
//!
//! Owns the per-city in-memory snapshots, the active-city pointer, and the
//! purge-old / fetch-new / persist-new sequence that runs when the shell
//! switches cities. All mutable state lives behind one lock and is only
//! changed here; the shell reads cloned snapshots, never live references.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Days, Local};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use skycast_weather::{CurrentConditions, DayConditions, WeatherClient, WeatherError};

use crate::predictor::{Predict, PredictError};
use crate::weather_store::{StoreError, WeatherStore};

/// Coordinator errors, already classified for the shell.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Unknown city index {0}")]
    UnknownCity(usize),
    #[error("Weather fetch failed: {0}")]
    Fetch(#[from] WeatherError),
    #[error("Current conditions unavailable for {0}")]
    MissingCurrentConditions(String),
    #[error("Cache update failed: {0}")]
    Store(#[from] StoreError),
    #[error("Prediction failed: {0}")]
    Prediction(#[from] PredictError),
}

impl CoordinatorError {
    /// A message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnknownCity(_) => "That city is not available.",
            Self::Fetch(_) => "Could not update weather data. Check your connection and try again.",
            Self::MissingCurrentConditions(_) => "Weather data is incomplete. Try again shortly.",
            Self::Store(_) => "A local data operation failed. Please try again.",
            Self::Prediction(_) => "The temperature prediction failed. Please try again.",
        }
    }
}

/// Result of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The activation sequence ran to completion.
    Completed,
    /// Another activation was in flight; this request was dropped.
    Busy,
}

/// Result of a prediction request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictionOutcome {
    /// The predictor ran; carries the latest stored value for the city, or
    /// `None` if it wrote nothing. `None` means "no prediction yet", not an
    /// error.
    Completed(Option<f64>),
    /// Another prediction was in flight; this request was dropped.
    Busy,
}

#[derive(Debug)]
struct CoordinatorState {
    /// Which city's durable rows are currently considered valid. Only
    /// advanced after a successful persist, so it can lag the in-memory
    /// snapshots.
    active_city: Option<String>,
    current: Vec<Option<CurrentConditions>>,
    tomorrow: Vec<Option<DayConditions>>,
}

/// Orchestrates remote fetch, local persistence, and snapshot invalidation
/// when the shell switches the active city or requests a forecast.
pub struct CityWeatherCoordinator {
    cities: Vec<String>,
    client: WeatherClient,
    store: Arc<Mutex<WeatherStore>>,
    predictor: Arc<dyn Predict>,
    state: RwLock<CoordinatorState>,
    activating: AtomicBool,
    predicting: AtomicBool,
}

/// Clears a busy flag when the guarded operation finishes, on every exit
/// path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn try_acquire(flag: &AtomicBool) -> Option<BusyGuard<'_>> {
    if flag
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        Some(BusyGuard(flag))
    } else {
        None
    }
}

impl CityWeatherCoordinator {
    /// Create a coordinator over a shared store handle.
    ///
    /// The store handle is shared rather than owned because the external
    /// predictor writes the same database; the caller keeps a handle for
    /// wiring it up.
    pub fn new(
        cities: Vec<String>,
        client: WeatherClient,
        store: Arc<Mutex<WeatherStore>>,
        predictor: Arc<dyn Predict>,
    ) -> Self {
        let len = cities.len();
        Self {
            cities,
            client,
            store,
            predictor,
            state: RwLock::new(CoordinatorState {
                active_city: None,
                current: vec![None; len],
                tomorrow: vec![None; len],
            }),
            activating: AtomicBool::new(false),
            predicting: AtomicBool::new(false),
        }
    }

    /// Supported city names in display order.
    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// City whose durable rows are currently valid, if any.
    pub fn active_city(&self) -> Option<String> {
        self.state.read().active_city.clone()
    }

    /// Current-conditions snapshot for a city index, if one has been fetched.
    pub fn current_conditions(&self, index: usize) -> Option<CurrentConditions> {
        self.state.read().current.get(index)?.clone()
    }

    /// Tomorrow's forecast snapshot for a city index, if one has been fetched.
    pub fn tomorrow_forecast(&self, index: usize) -> Option<DayConditions> {
        self.state.read().tomorrow.get(index)?.clone()
    }

    /// Whether a city activation is in flight.
    pub fn is_activating(&self) -> bool {
        self.activating.load(Ordering::SeqCst)
    }

    /// Whether a prediction run is in flight.
    pub fn is_predicting(&self) -> bool {
        self.predicting.load(Ordering::SeqCst)
    }

    /// Make a city the active one: purge the previously cached city's rows,
    /// fetch today's conditions and tomorrow's forecast, persist the
    /// combined row, and advance the active-city pointer.
    ///
    /// At most one activation runs at a time; a request arriving while one
    /// is in flight returns [`Activation::Busy`] untouched. On any failure
    /// the in-memory snapshots keep their previous values and the pointer
    /// does not move, so the shell keeps showing the last good data and a
    /// retry will redo the same cleanup.
    pub async fn activate_city(&self, index: usize) -> Result<Activation, CoordinatorError> {
        let city = self
            .cities
            .get(index)
            .cloned()
            .ok_or(CoordinatorError::UnknownCity(index))?;

        let Some(_busy) = try_acquire(&self.activating) else {
            tracing::debug!("Activation already in flight; ignoring switch to {}", city);
            return Ok(Activation::Busy);
        };
        tracing::info!("Activating city {}", city);

        // Evict the previously cached city before loading a new one. Same
        // city again means nothing to evict.
        let previous = self.state.read().active_city.clone();
        if let Some(prev) = previous.filter(|p| *p != city) {
            self.with_store(move |s| s.purge_city(&prev)).await?;
        }

        // Today's conditions drive the display snapshot. A payload without
        // them leaves the previous snapshot in place.
        let today = Local::now().date_naive();
        let today_timeline = self.client.fetch_timeline(&city, today).await?;
        if let Some(conditions) = today_timeline.current() {
            self.state.write().current[index] = Some(conditions);
        }

        // Tomorrow's forecast feeds the durable row. The persisted
        // temperature is today's observed value; humidity and wind come from
        // the forecast day. The predictor trains on exactly this pairing.
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
        let tomorrow_timeline = self.client.fetch_timeline(&city, tomorrow).await?;
        match tomorrow_timeline.first_day() {
            Some(day) => {
                let today_temp = self
                    .state
                    .read()
                    .current
                    .get(index)
                    .and_then(|c| c.as_ref().map(|c| c.temperature))
                    .ok_or_else(|| CoordinatorError::MissingCurrentConditions(city.clone()))?;

                let record_city = city.clone();
                let (humidity, wind_speed) = (day.humidity, day.wind_speed);
                self.with_store(move |s| {
                    s.replace_city_records(&record_city, today_temp, humidity, wind_speed, tomorrow)
                })
                .await?;

                let mut state = self.state.write();
                state.tomorrow[index] = Some(day);
                state.active_city = Some(city.clone());
                tracing::info!("Successfully activated {}", city);
            }
            None => {
                // No forecast day: keep whatever was cached before and do
                // not advance the pointer. The durable cache may lag the
                // in-memory today snapshot here.
                tracing::warn!("No forecast returned for {}; cache left as-is", city);
            }
        }

        Ok(Activation::Completed)
    }

    /// Run the external predictor for a city and read back its result.
    ///
    /// At most one prediction runs at a time; requests arriving while one is
    /// in flight return [`PredictionOutcome::Busy`]. Callers are expected to
    /// only ask about the currently active city; the coordinator does not
    /// police this.
    pub async fn request_prediction(
        &self,
        city: &str,
    ) -> Result<PredictionOutcome, CoordinatorError> {
        let Some(_busy) = try_acquire(&self.predicting) else {
            tracing::debug!("Prediction already in flight; ignoring request for {}", city);
            return Ok(PredictionOutcome::Busy);
        };
        tracing::info!("Requesting prediction for {}", city);

        self.predictor.run(city).await?;

        let value = self.latest_prediction(city).await?;
        if value.is_none() {
            tracing::warn!("Predictor finished for {} but wrote no row", city);
        }
        Ok(PredictionOutcome::Completed(value))
    }

    /// Latest stored prediction for a city, or `None` if none exists yet.
    pub async fn latest_prediction(&self, city: &str) -> Result<Option<f64>, CoordinatorError> {
        let city = city.to_string();
        Ok(self.with_store(move |s| s.latest_prediction(&city)).await?)
    }

    /// Run a storage operation on the blocking pool, keeping the single
    /// long-lived connection behind its mutex.
    async fn with_store<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut WeatherStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&mut store.lock()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
