use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Supported cities, in display order. The index a city appears at is a
    /// display convenience only; the name is its identity everywhere else.
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,

    /// Weather vendor API settings
    #[serde(default)]
    pub weather_api: WeatherApiConfig,

    /// Local cache database settings
    #[serde(default)]
    pub store: StoreConfig,

    /// External predictor process settings
    #[serde(default)]
    pub predictor: PredictorConfig,

    /// UI preferences
    #[serde(default)]
    pub ui: UiConfig,
}

fn default_cities() -> Vec<String> {
    vec![
        "Chennai".to_string(),
        "Bangalore".to_string(),
        "Delhi".to_string(),
    ]
}

/// Weather vendor API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherApiConfig {
    /// Base URL of the timeline weather endpoint
    pub base_url: String,
    /// API key appended to every request
    pub api_key: String,
}

impl WeatherApiConfig {
    /// Check if an API key is configured (not a placeholder)
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.starts_with("YOUR_")
    }
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            base_url:
                "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline"
                    .to_string(),
            api_key: "YOUR_WEATHER_API_KEY".to_string(),
        }
    }
}

/// Local cache database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_store_path_str")]
    pub path: String,
}

fn default_store_path_str() -> String {
    default_store_path().to_string_lossy().into_owned()
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
        .join("weather.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path_str(),
        }
    }
}

/// External predictor process configuration.
///
/// The runner invokes `command` with `args` followed by the lowercase city
/// name as the final argument, so `command = "python3", args = ["predict.py"]`
/// runs `python3 predict.py chennai`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Program to launch
    pub command: String,
    /// Arguments placed before the city name
    #[serde(default)]
    pub args: Vec<String>,
    /// Seconds to wait for the process before giving up
    #[serde(default = "default_predictor_timeout")]
    pub timeout_secs: u64,
}

fn default_predictor_timeout() -> u64 {
    120
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["predict.py".to_string()],
            timeout_secs: default_predictor_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Window width
    pub window_width: u32,

    /// Window height
    pub window_height: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            cities: default_cities(),
            weather_api: WeatherApiConfig::default(),
            store: StoreConfig::default(),
            predictor: PredictorConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        if !validation.warnings.is_empty() {
            for warning in &validation.warnings {
                tracing::warn!("Config warning: {}", warning);
            }
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.cities.is_empty() {
            result.add_error("cities", "At least one city must be configured");
        }
        if self.cities.iter().any(|c| c.trim().is_empty()) {
            result.add_error("cities", "City names must not be empty");
        }

        match Url::parse(&self.weather_api.base_url) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        "weather_api.base_url",
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
            }
            Err(e) => {
                result.add_error("weather_api.base_url", format!("Invalid URL: {}", e));
            }
        }

        if !self.weather_api.is_configured() {
            result.add_warning(
                "weather_api.api_key",
                "No API key configured; weather fetches will be rejected by the vendor",
            );
        }

        if self.predictor.command.trim().is_empty() {
            result.add_error("predictor.command", "Predictor command must not be empty");
        }
        if self.predictor.timeout_secs == 0 {
            result.add_error(
                "predictor.timeout_secs",
                "Predictor timeout must be greater than 0",
            );
        }

        if self.ui.window_width == 0 {
            result.add_error("ui.window_width", "Window width must be greater than 0");
        }
        if self.ui.window_height == 0 {
            result.add_error("ui.window_height", "Window height must be greater than 0");
        }

        result
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;

        tracing::debug!("Saved config to {}", config_path.display());
        Ok(())
    }

    /// Path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let validation = config.validate();
        assert!(validation.is_valid(), "{}", validation.error_summary());
        assert_eq!(config.cities.len(), 3);
        assert_eq!(config.cities[0], "Chennai");
    }

    #[test]
    fn test_default_api_key_warns() {
        let config = Config::default();
        let validation = config.validate();
        assert!(validation
            .warnings
            .iter()
            .any(|w| w.field == "weather_api.api_key"));
    }

    #[test]
    fn test_empty_cities_rejected() {
        let mut config = Config::default();
        config.cities.clear();
        let validation = config.validate();
        assert!(!validation.is_valid());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = Config::default();
        config.weather_api.base_url = "not a url".to_string();
        assert!(!config.validate().is_valid());

        config.weather_api.base_url = "ftp://example.com".to_string();
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_zero_predictor_timeout_rejected() {
        let mut config = Config::default();
        config.predictor.timeout_secs = 0;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.cities, config.cities);
        assert_eq!(parsed.weather_api.base_url, config.weather_api.base_url);
        assert_eq!(parsed.predictor.timeout_secs, config.predictor.timeout_secs);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str(r#"config_dir = "/tmp/skycast""#).unwrap();
        assert_eq!(parsed.cities, super::default_cities());
        assert_eq!(parsed.predictor.timeout_secs, 120);
        assert_eq!(parsed.ui.window_width, 800);
    }
}
