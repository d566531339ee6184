//! Timeline API client: one GET per (location, date), no retries.

use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;

use crate::types::{Timeline, WeatherError};

const CONNECT_TIMEOUT_SECS: u64 = 5;
const REQUEST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    /// Create a client for the given timeline endpoint.
    ///
    /// The base URL is configurable so deployments (and tests) can point at
    /// a different vendor host.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch the timeline payload for one location and date.
    ///
    /// A single attempt: network errors, timeouts, and non-200 statuses are
    /// all reported as failures for the caller to classify. Missing payload
    /// sections are not errors; see [`Timeline`].
    pub async fn fetch_timeline(
        &self,
        location: &str,
        date: NaiveDate,
    ) -> Result<Timeline, WeatherError> {
        if location.trim().is_empty() {
            return Err(WeatherError::InvalidLocation);
        }

        let url = format!(
            "{}/{}/{}?unitGroup=metric&key={}&contentType=json",
            self.base_url,
            urlencoding::encode(location),
            date.format("%Y-%m-%d"),
            self.api_key,
        );

        tracing::debug!("Fetching weather for {} on {}", location, date);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                "Weather fetch for {} failed with status {}",
                location,
                status
            );
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let timeline: Timeline =
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))?;

        tracing::debug!(
            "Weather payload for {}: current={}, days={}",
            location,
            timeline.current_conditions.is_some(),
            timeline.days.len()
        );
        Ok(timeline)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Chennai/2026-08-07"))
            .and(query_param("unitGroup", "metric"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": "Chennai",
                "timezone": "Asia/Kolkata",
                "currentConditions": {
                    "temp": 30.2,
                    "humidity": 55,
                    "windspeed": 12,
                    "conditions": "Clear"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&mock_server.uri(), "test-key").unwrap();
        let timeline = client.fetch_timeline("Chennai", test_date()).await.unwrap();

        let current = timeline.current().unwrap();
        assert_eq!(current.temperature, 30.2);
        assert_eq!(current.address, "Chennai");
    }

    #[tokio::test]
    async fn test_fetch_non_200_is_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&mock_server.uri(), "test-key").unwrap();
        let result = client.fetch_timeline("Chennai", test_date()).await;

        assert!(matches!(result, Err(WeatherError::Status(500))));
    }

    #[tokio::test]
    async fn test_fetch_unauthorized_is_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&mock_server.uri(), "bad-key").unwrap();
        let result = client.fetch_timeline("Chennai", test_date()).await;

        assert!(matches!(result, Err(WeatherError::Status(401))));
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&mock_server.uri(), "test-key").unwrap();
        let result = client.fetch_timeline("Chennai", test_date()).await;

        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_empty_location_rejected() {
        let client = WeatherClient::new("http://localhost:9", "test-key").unwrap();
        let result = client.fetch_timeline("  ", test_date()).await;

        assert!(matches!(result, Err(WeatherError::InvalidLocation)));
    }

    #[tokio::test]
    async fn test_location_is_url_encoded() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/New%20Delhi/2026-08-07"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&mock_server.uri(), "test-key").unwrap();
        let timeline = client
            .fetch_timeline("New Delhi", test_date())
            .await
            .unwrap();
        assert!(timeline.days.is_empty());
    }
}
