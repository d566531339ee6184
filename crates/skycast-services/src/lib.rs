//! Orchestration services for Skycast: the SQLite session cache, the
//! external predictor launcher, and the city activation coordinator.

pub mod coordinator;
pub mod predictor;
pub mod weather_store;

pub use coordinator::{
    Activation, CityWeatherCoordinator, CoordinatorError, PredictionOutcome,
};
pub use predictor::{Predict, PredictError, ProcessPredictor};
pub use weather_store::{StoreError, WeatherRecord, WeatherStore};
