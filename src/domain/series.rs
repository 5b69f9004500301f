//! Forecast series shapes held by the cache.

use std::fmt;

pub use solar_sentinel_api_types::{DailySummary, HourlySeries};

/// Distinguishes the two forecast shapes and their cache key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Hourly,
    Daily,
}

impl SeriesKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transformed series as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastPayload {
    Hourly(HourlySeries),
    Daily(DailySummary),
}

impl ForecastPayload {
    pub fn kind(&self) -> SeriesKind {
        match self {
            Self::Hourly(_) => SeriesKind::Hourly,
            Self::Daily(_) => SeriesKind::Daily,
        }
    }
}

/// Typed access to one variant of [`ForecastPayload`].
pub trait Series: Clone + Send + Sync + 'static {
    const KIND: SeriesKind;

    fn from_payload(payload: &ForecastPayload) -> Option<Self>;

    fn into_payload(self) -> ForecastPayload;
}

impl Series for HourlySeries {
    const KIND: SeriesKind = SeriesKind::Hourly;

    fn from_payload(payload: &ForecastPayload) -> Option<Self> {
        match payload {
            ForecastPayload::Hourly(series) => Some(series.clone()),
            ForecastPayload::Daily(_) => None,
        }
    }

    fn into_payload(self) -> ForecastPayload {
        ForecastPayload::Hourly(self)
    }
}

impl Series for DailySummary {
    const KIND: SeriesKind = SeriesKind::Daily;

    fn from_payload(payload: &ForecastPayload) -> Option<Self> {
        match payload {
            ForecastPayload::Daily(summary) => Some(summary.clone()),
            ForecastPayload::Hourly(_) => None,
        }
    }

    fn into_payload(self) -> ForecastPayload {
        ForecastPayload::Daily(self)
    }
}
