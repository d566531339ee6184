//! Core configuration and startup plumbing for Skycast.

pub mod config;

pub use config::{Config, PredictorConfig, StoreConfig, UiConfig, WeatherApiConfig};

use anyhow::Result;

/// Initialize logging. Call once at process start.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Skycast core initialized");
    Ok(())
}
