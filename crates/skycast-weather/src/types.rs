use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw timeline payload returned by the weather service.
///
/// Only unparsable JSON is a fetch error; a payload missing
/// `currentConditions` or `days` simply carries no data for that section.
#[derive(Debug, Clone, Deserialize)]
pub struct Timeline {
    pub address: Option<String>,
    pub timezone: Option<String>,
    #[serde(rename = "currentConditions")]
    pub current_conditions: Option<RawConditions>,
    #[serde(default)]
    pub days: Vec<RawDay>,
}

/// `currentConditions` object as the service sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConditions {
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub windspeed: Option<f64>,
    pub conditions: Option<String>,
}

/// One entry of the `days` array.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDay {
    pub datetime: Option<String>,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub windspeed: Option<f64>,
    pub conditions: Option<String>,
}

/// Current conditions for a city, held in memory for rendering.
/// Never persisted; overwritten wholesale on each successful fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub conditions: String,
    pub address: String,
    pub timezone: String,
}

/// One forecast day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayConditions {
    pub date: Option<NaiveDate>,
    pub temperature: Option<f64>,
    pub humidity: f64,
    pub wind_speed: f64,
    pub conditions: Option<String>,
}

impl Timeline {
    /// Current conditions, if the payload carries them with a temperature.
    /// The location and timezone labels come from the top-level payload.
    pub fn current(&self) -> Option<CurrentConditions> {
        let raw = self.current_conditions.as_ref()?;
        let temperature = raw.temp?;
        Some(CurrentConditions {
            temperature,
            humidity: raw.humidity.unwrap_or_default(),
            wind_speed: raw.windspeed.unwrap_or_default(),
            conditions: raw.conditions.clone().unwrap_or_default(),
            address: self.address.clone().unwrap_or_default(),
            timezone: self.timezone.clone().unwrap_or_default(),
        })
    }

    /// First forecast day, if one is present with the humidity and wind
    /// fields the cache needs. A day missing either is treated as no
    /// forecast at all.
    pub fn first_day(&self) -> Option<DayConditions> {
        let raw = self.days.first()?;
        let humidity = raw.humidity?;
        let wind_speed = raw.windspeed?;
        Some(DayConditions {
            date: raw
                .datetime
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            temperature: raw.temp,
            humidity,
            wind_speed,
            conditions: raw.conditions.clone(),
        })
    }
}

/// Weather client errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather service returned status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid location: city name must not be empty")]
    InvalidLocation,
}
