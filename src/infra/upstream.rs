//! Open-Meteo forecast client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono_tz::Tz;
use metrics::histogram;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::domain::series::SeriesKind;

use super::error::InfraError;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub(crate) const METRIC_UPSTREAM_REQUEST_MS: &str = "solar_sentinel_upstream_request_ms";

const HOURLY_FIELDS: &str = "uv_index,uv_index_clear_sky,precipitation_probability,temperature_2m,apparent_temperature,cloud_cover,relative_humidity_2m";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,uv_index_max,precipitation_probability_max,relative_humidity_2m_max";
const FORECAST_DAYS: &str = "16";
const TEMPERATURE_UNIT: &str = "fahrenheit";

/// Parameters for one upstream forecast request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpstreamQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawHourlyForecast {
    pub hourly: RawHourlyFields,
}

/// Hourly arrays as returned by the provider, indexed in parallel with `time`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawHourlyFields {
    pub time: Vec<String>,
    pub uv_index: Vec<Option<f64>>,
    pub uv_index_clear_sky: Vec<Option<f64>>,
    pub precipitation_probability: Vec<Option<f64>>,
    pub temperature_2m: Vec<Option<f64>>,
    pub apparent_temperature: Vec<Option<f64>>,
    pub cloud_cover: Vec<Option<f64>>,
    pub relative_humidity_2m: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDailyForecast {
    pub daily: RawDailyFields,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawDailyFields {
    pub time: Vec<String>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub uv_index_max: Vec<Option<f64>>,
    pub precipitation_probability_max: Vec<Option<f64>>,
    pub relative_humidity_2m_max: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("forecast provider responded with status {status}")]
    Status { status: u16 },
    #[error("forecast provider unreachable: {message}")]
    Network { message: String },
    #[error("forecast provider returned an unreadable body: {message}")]
    Decode { message: String },
}

/// Source of raw forecast data.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch_hourly(&self, query: &UpstreamQuery) -> Result<RawHourlyForecast, UpstreamError>;

    async fn fetch_daily(&self, query: &UpstreamQuery) -> Result<RawDailyForecast, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: Url,
}

impl OpenMeteoClient {
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self, InfraError> {
        let mut builder = Client::builder().user_agent(Self::user_agent());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|err| {
            InfraError::configuration(format!("failed to build upstream http client: {err}"))
        })?;
        Ok(Self { client, base_url })
    }

    pub fn user_agent() -> &'static str {
        concat!("solar-sentinel/", env!("CARGO_PKG_VERSION"))
    }

    fn forecast_url(&self, kind: SeriesKind, query: &UpstreamQuery) -> Url {
        let (field_param, fields) = match kind {
            SeriesKind::Hourly => ("hourly", HOURLY_FIELDS),
            SeriesKind::Daily => ("daily", DAILY_FIELDS),
        };

        let mut url = self.base_url.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("latitude", &query.latitude.to_string())
            .append_pair("longitude", &query.longitude.to_string())
            .append_pair(field_param, fields)
            .append_pair("timezone", query.timezone.name())
            .append_pair("temperature_unit", TEMPERATURE_UNIT)
            .append_pair("forecast_days", FORECAST_DAYS);
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        kind: SeriesKind,
        query: &UpstreamQuery,
    ) -> Result<T, UpstreamError> {
        let url = self.forecast_url(kind, query);
        let started_at = Instant::now();

        let result = self.send(url).await;
        histogram!(METRIC_UPSTREAM_REQUEST_MS, "kind" => kind.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        let bytes = result?;
        serde_json::from_slice(&bytes).map_err(|err| UpstreamError::Decode {
            message: err.to_string(),
        })
    }

    async fn send(&self, url: Url) -> Result<bytes::Bytes, UpstreamError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| UpstreamError::Network {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!(
                target = "infra::upstream",
                status = status.as_u16(),
                "forecast provider rejected request"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|err| UpstreamError::Network {
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoClient {
    async fn fetch_hourly(&self, query: &UpstreamQuery) -> Result<RawHourlyForecast, UpstreamError> {
        self.get_json(SeriesKind::Hourly, query).await
    }

    async fn fetch_daily(&self, query: &UpstreamQuery) -> Result<RawDailyForecast, UpstreamError> {
        self.get_json(SeriesKind::Daily, query).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn client() -> OpenMeteoClient {
        let base = Url::parse(DEFAULT_BASE_URL).expect("url");
        OpenMeteoClient::new(base, None).expect("client")
    }

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn hourly_url_carries_all_parameters() {
        let query = UpstreamQuery {
            latitude: 40.7206,
            longitude: -74.3637,
            timezone: chrono_tz::America::New_York,
        };
        let url = client().forecast_url(SeriesKind::Hourly, &query);
        let params = query_map(&url);

        assert_eq!(url.path(), "/v1/forecast");
        assert_eq!(params["latitude"], "40.7206");
        assert_eq!(params["longitude"], "-74.3637");
        assert_eq!(params["hourly"], HOURLY_FIELDS);
        assert_eq!(params["timezone"], "America/New_York");
        assert_eq!(params["temperature_unit"], "fahrenheit");
        assert_eq!(params["forecast_days"], "16");
        assert!(!params.contains_key("daily"));
    }

    #[test]
    fn daily_url_uses_daily_fields() {
        let query = UpstreamQuery {
            latitude: 51.5,
            longitude: -0.1,
            timezone: chrono_tz::UTC,
        };
        let params = query_map(&client().forecast_url(SeriesKind::Daily, &query));
        assert_eq!(params["daily"], DAILY_FIELDS);
        assert_eq!(params["timezone"], "UTC");
    }

    #[test]
    fn raw_payload_tolerates_nulls_and_missing_fields() {
        let body = r#"{"hourly":{"time":["2025-01-15T00:00"],"uv_index":[null]}}"#;
        let raw: RawHourlyForecast = serde_json::from_str(body).expect("decode");
        assert_eq!(raw.hourly.time.len(), 1);
        assert_eq!(raw.hourly.uv_index, vec![None]);
        assert!(raw.hourly.temperature_2m.is_empty());
    }

    #[test]
    fn raw_payload_requires_the_series_object() {
        let body = r#"{"latitude":40.72,"longitude":-74.36}"#;
        assert!(serde_json::from_str::<RawHourlyForecast>(body).is_err());
        assert!(serde_json::from_str::<RawDailyForecast>(body).is_err());
    }
}
