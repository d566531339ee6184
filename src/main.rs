use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use skycast_core::Config;
use skycast_services::{CityWeatherCoordinator, ProcessPredictor, WeatherStore};
use skycast_weather::WeatherClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skycast_core::init()?;

    let (config, _validation) = Config::load_validated()?;

    // Without a working store the rest of the system has no valid state;
    // failures here are fatal.
    let store = WeatherStore::open(&config.store.path).context("Failed to open weather store")?;

    // The cache only exists to hand rows to the predictor within one
    // session; discard anything a previous run left behind.
    store
        .clear_all()
        .context("Failed to clear previous session data")?;
    let store = Arc::new(Mutex::new(store));

    let client = WeatherClient::new(&config.weather_api.base_url, &config.weather_api.api_key)
        .context("Failed to build weather client")?;

    let predictor = Arc::new(ProcessPredictor::new(
        config.predictor.command.clone(),
        config.predictor.args.clone(),
        Duration::from_secs(config.predictor.timeout_secs),
    ));

    let coordinator =
        CityWeatherCoordinator::new(config.cities.clone(), client, store, predictor);

    // Bring up the first city before handing off to the shell, like the
    // shell's own city switches would.
    coordinator
        .activate_city(0)
        .await
        .context("Failed to activate initial city")?;

    tracing::info!("Skycast started");

    println!("Skycast - City Weather Dashboard");
    println!("\nConfiguration:");
    println!("  Config directory: {}", config.config_dir.display());
    println!("  Cache database:   {}", config.store.path);
    println!(
        "  Window:           {}x{}",
        config.ui.window_width, config.ui.window_height
    );
    println!("\nCities: {}", coordinator.cities().join(", "));

    if let Some(snapshot) = coordinator.current_conditions(0) {
        println!(
            "\n{} ({}): {:.1}°C, {}, humidity {:.0}%, wind {:.1} km/h",
            snapshot.address,
            snapshot.timezone,
            snapshot.temperature,
            snapshot.conditions,
            snapshot.humidity,
            snapshot.wind_speed,
        );
    }
    if let Some(forecast) = coordinator.tomorrow_forecast(0) {
        println!(
            "Tomorrow: humidity {:.0}%, wind {:.1} km/h",
            forecast.humidity, forecast.wind_speed,
        );
    }

    Ok(())
}
