use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use thiserror::Error;

use super::models::{Coordinate, InputError, RequestTag, TaggedForecast};
use crate::db::ForecastArchive;

pub const DARKSKY_API_URL: &str = "https://api.darksky.net";

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Forecast request failed after retry: {0}")]
    Network(String),

    #[error("Invalid forecast data: {0}")]
    Input(#[from] InputError),

    #[error("Forecast archive error: {0}")]
    Persistence(String),
}

/// Source of raw forecasts for a coordinate
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Fetch the forecast period beginning at the start of `day`
    async fn fetch(
        &self,
        coordinate: Coordinate,
        day: NaiveDate,
    ) -> Result<TaggedForecast, ForecastError>;
}

/// Settings for the Dark Sky style forecast client
#[derive(Debug, Clone)]
pub struct ForecastClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timezone: Tz,
    pub retry_delay: Duration,
}

/// HTTP client for the upstream forecast API with one delayed retry
pub struct ForecastClient {
    client: Client,
    config: ForecastClientConfig,
    archive: Option<Arc<dyn ForecastArchive>>,
}

impl ForecastClient {
    pub fn new(client: Client, config: ForecastClientConfig) -> Self {
        Self {
            client,
            config: ForecastClientConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            archive: None,
        }
    }

    /// Archive every successful response
    pub fn with_archive(mut self, archive: Arc<dyn ForecastArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Unix timestamp of local midnight for `day`
    fn start_of_day(&self, day: NaiveDate) -> Result<i64, ForecastError> {
        let midnight = day.and_time(chrono::NaiveTime::MIN);
        self.config
            .timezone
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.timestamp())
            .ok_or_else(|| InputError::InvalidLocalTime(midnight.to_string()).into())
    }

    fn forecast_url(&self, coordinate: Coordinate, timestamp: i64) -> String {
        format!(
            "{}/forecast/{}/{},{},{}",
            self.config.base_url,
            self.config.api_key,
            coordinate.latitude,
            coordinate.longitude,
            timestamp
        )
    }

    /// One GET; non-2xx statuses count as failures
    async fn attempt(&self, url: &str) -> Result<(String, String), String> {
        let response = self
            .client
            .get(url)
            .query(&[("units", "ca"), ("lang", "de"), ("exclude", "alerts")])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let resolved = response.url().to_string();
        tracing::debug!(status = %status, url = %resolved, "Received forecast response");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status, text));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok((resolved, body))
    }

    async fn archive(&self, forecast: &TaggedForecast) -> Result<(), ForecastError> {
        let Some(archive) = &self.archive else {
            return Ok(());
        };

        let inserted = archive
            .insert(&forecast.document)
            .await
            .map_err(|e| ForecastError::Persistence(e.to_string()))?;

        if inserted != 1 {
            return Err(ForecastError::Persistence(format!(
                "expected 1 inserted document, got {}",
                inserted
            )));
        }

        tracing::debug!("Archived forecast document");
        Ok(())
    }
}

#[async_trait]
impl ForecastProvider for ForecastClient {
    async fn fetch(
        &self,
        coordinate: Coordinate,
        day: NaiveDate,
    ) -> Result<TaggedForecast, ForecastError> {
        let timestamp = self.start_of_day(day)?;
        let url = self.forecast_url(coordinate, timestamp);

        tracing::debug!(
            lat = %coordinate.latitude,
            lon = %coordinate.longitude,
            timestamp = timestamp,
            "Fetching forecast"
        );

        let (resolved, body) = match self.attempt(&url).await {
            Ok(ok) => ok,
            Err(first) => {
                tracing::warn!(
                    error = %first,
                    delay_secs = self.config.retry_delay.as_secs(),
                    "Forecast request failed, retrying"
                );
                tokio::time::sleep(self.config.retry_delay).await;
                self.attempt(&url).await.map_err(ForecastError::Network)?
            }
        };

        let document: serde_json::Value =
            serde_json::from_str(&body).map_err(InputError::Malformed)?;

        let tag = RequestTag {
            time: Utc::now(),
            lat: coordinate.latitude,
            lon: coordinate.longitude,
            api_key: self.config.api_key.clone(),
            url: resolved,
        };
        let forecast = TaggedForecast::from_document(document, &tag)?;

        self.archive(&forecast).await?;

        tracing::info!(
            hours = forecast.data.hourly.data.len(),
            days = forecast.data.daily.data.len(),
            "Forecast fetched successfully"
        );

        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COORD: Coordinate = Coordinate {
        latitude: 47.5,
        longitude: 8.25,
    };

    /// Archive double that reports a fixed row count
    struct CountingArchive {
        writes: AtomicUsize,
        reported: u64,
    }

    impl CountingArchive {
        fn new(reported: u64) -> Arc<Self> {
            Arc::new(Self {
                writes: AtomicUsize::new(0),
                reported,
            })
        }
    }

    #[async_trait]
    impl ForecastArchive for CountingArchive {
        async fn insert(&self, _document: &serde_json::Value) -> Result<u64, DbError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(self.reported)
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn midnight() -> i64 {
        chrono_tz::Europe::Berlin
            .with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
            .unwrap()
            .timestamp()
    }

    fn forecast_path() -> String {
        format!("/forecast/test-key/47.5,8.25,{}", midnight())
    }

    fn sample_body() -> serde_json::Value {
        serde_json::json!({
            "latitude": 47.5,
            "longitude": 8.25,
            "hourly": { "data": [
                { "time": 1717236000, "temperature": 21.3, "windSpeed": 18.0,
                  "windBearing": 250, "cloudCover": 0.3, "precipIntensity": 0.0 }
            ] },
            "daily": { "data": [ { "sunriseTime": 1717212600, "sunsetTime": 1717270500 } ] }
        })
    }

    fn client(server: &MockServer) -> ForecastClient {
        ForecastClient::new(
            Client::new(),
            ForecastClientConfig {
                base_url: format!("{}/", server.uri()),
                api_key: "test-key".to_string(),
                timezone: chrono_tz::Europe::Berlin,
                retry_delay: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_fetch_success_uses_start_of_day_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(forecast_path()))
            .and(query_param("units", "ca"))
            .and(query_param("lang", "de"))
            .and(query_param("exclude", "alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&server)
            .await;

        let forecast = client(&server).fetch(COORD, day()).await.unwrap();

        assert_eq!(forecast.data.hourly.data.len(), 1);
        assert_eq!(forecast.document["hourly"], sample_body()["hourly"]);
        assert_eq!(forecast.document["_request"]["api_key"], "test-key");
        let url = forecast.document["_request"]["url"].as_str().unwrap();
        assert!(url.contains(&forecast_path()));
        assert!(url.contains("units=ca"));
    }

    #[tokio::test]
    async fn test_fetch_retries_once_after_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(forecast_path()))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(forecast_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .with_priority(2)
            .mount(&server)
            .await;

        let archive = CountingArchive::new(1);
        let forecast = client(&server)
            .with_archive(archive.clone())
            .fetch(COORD, day())
            .await
            .unwrap();

        assert_eq!(forecast.document["hourly"], sample_body()["hourly"]);
        assert_eq!(archive.writes.load(Ordering::SeqCst), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_fails_after_second_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let archive = CountingArchive::new(1);
        let result = client(&server)
            .with_archive(archive.clone())
            .fetch(COORD, day())
            .await;

        assert!(matches!(result, Err(ForecastError::Network(_))));
        assert_eq!(archive.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_input_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).fetch(COORD, day()).await;
        assert!(matches!(result, Err(ForecastError::Input(_))));
    }

    #[tokio::test]
    async fn test_archive_must_confirm_exactly_one_insert() {
        for reported in [0, 2] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
                .mount(&server)
                .await;

            let result = client(&server)
                .with_archive(CountingArchive::new(reported))
                .fetch(COORD, day())
                .await;

            assert!(
                matches!(result, Err(ForecastError::Persistence(_))),
                "reported {reported} rows"
            );
        }
    }

    #[test]
    fn test_forecast_url_trims_trailing_slash() {
        let client = ForecastClient::new(
            Client::new(),
            ForecastClientConfig {
                base_url: "https://api.example.test/".to_string(),
                api_key: "k".to_string(),
                timezone: chrono_tz::UTC,
                retry_delay: Duration::ZERO,
            },
        );

        assert_eq!(
            client.forecast_url(COORD, 1_717_200_000),
            "https://api.example.test/forecast/k/47.5,8.25,1717200000"
        );
    }
}
