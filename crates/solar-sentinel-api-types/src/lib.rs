//! Wire types shared by the Solar Sentinel server and its clients.
//!
//! Field names follow the camelCase JSON contract consumed by the dashboard.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Response header carrying `hit` or `miss` for forecast endpoints.
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

/// Per-hour forecast for a single calendar date, stored as parallel arrays.
///
/// Every array has one element per upstream timestamp falling on `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlySeries {
    pub labels: Vec<String>,
    pub uv: Vec<Option<f64>>,
    pub uv_clear_sky: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
    pub temperature: Vec<Option<f64>>,
    pub apparent_temperature: Vec<Option<f64>>,
    pub cloud_cover: Vec<Option<f64>>,
    pub humidity: Vec<Option<f64>>,
    pub date: String,
}

impl HourlySeries {
    /// Number of hourly records in the series.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Single-record daily aggregate for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: String,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub uv_max: Option<f64>,
    pub precip_max: Option<f64>,
    pub humidity_max: Option<f64>,
}

/// Cache provenance attached to every forecast response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub cached: bool,
    /// Milliseconds since the cached entry was stored.
    pub cache_age: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecastResponse {
    #[serde(flatten)]
    pub series: HourlySeries,
    pub metadata: CacheMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummaryResponse {
    #[serde(flatten)]
    pub summary: DailySummary,
    pub metadata: CacheMetadata,
}

/// Result of comparing a client-held cache timestamp with the server's entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub has_update: bool,
    /// Epoch milliseconds of the server's entry, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
