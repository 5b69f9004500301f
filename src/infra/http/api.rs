//! JSON forecast endpoints.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::HeaderName,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use solar_sentinel_api_types::{
    CACHE_STATUS_HEADER, CacheMetadata, DailySummaryResponse, HourlyForecastResponse,
    PollResponse,
};
use time::OffsetDateTime;

use crate::application::forecast::{Forecast, ForecastRequest};
use crate::domain::series::SeriesKind;

use super::HttpState;
use super::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ForecastQuery {
    lat: Option<String>,
    lon: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PollQuery {
    lat: Option<String>,
    lon: Option<String>,
    date: Option<String>,
    timestamp: Option<String>,
}

/// GET /api/uv-today
pub(crate) async fn uv_today(
    State(state): State<HttpState>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    const SOURCE: &str = "infra::http::api::uv_today";
    let Query(query) = query.map_err(|rejection| ApiError::query(SOURCE, rejection))?;
    let request = validate(&state, &query, SOURCE)?;

    let forecast = state
        .forecast
        .hourly(request)
        .await
        .map_err(|err| ApiError::forecast(SOURCE, SeriesKind::Hourly, &err))?;

    let cached = forecast.cached;
    let metadata = metadata(&forecast);
    let body = HourlyForecastResponse {
        series: forecast.payload,
        metadata,
    };
    Ok(with_cache_status(Json(body), cached))
}

/// GET /api/daily-summary
pub(crate) async fn daily_summary(
    State(state): State<HttpState>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    const SOURCE: &str = "infra::http::api::daily_summary";
    let Query(query) = query.map_err(|rejection| ApiError::query(SOURCE, rejection))?;
    let request = validate(&state, &query, SOURCE)?;

    let forecast = state
        .forecast
        .daily(request)
        .await
        .map_err(|err| ApiError::forecast(SOURCE, SeriesKind::Daily, &err))?;

    let cached = forecast.cached;
    let metadata = metadata(&forecast);
    let body = DailySummaryResponse {
        summary: forecast.payload,
        metadata,
    };
    Ok(with_cache_status(Json(body), cached))
}

/// GET /api/uv-today/poll
pub(crate) async fn uv_poll(
    State(state): State<HttpState>,
    query: Result<Query<PollQuery>, QueryRejection>,
) -> Result<Json<PollResponse>, ApiError> {
    const SOURCE: &str = "infra::http::api::uv_poll";
    let Query(query) = query.map_err(|rejection| ApiError::query(SOURCE, rejection))?;
    let request = state
        .validator
        .forecast_request(
            query.lat.as_deref(),
            query.lon.as_deref(),
            query.date.as_deref(),
            OffsetDateTime::now_utc(),
        )
        .map_err(|err| ApiError::validation(SOURCE, err))?;
    let client_timestamp = state
        .validator
        .poll_timestamp(query.timestamp.as_deref())
        .map_err(|err| ApiError::validation(SOURCE, err))?;

    let status = state.forecast.poll(request, client_timestamp);
    Ok(Json(PollResponse {
        has_update: status.has_update,
        timestamp: status.timestamp,
    }))
}

fn validate(
    state: &HttpState,
    query: &ForecastQuery,
    source: &'static str,
) -> Result<ForecastRequest, ApiError> {
    state
        .validator
        .forecast_request(
            query.lat.as_deref(),
            query.lon.as_deref(),
            query.date.as_deref(),
            OffsetDateTime::now_utc(),
        )
        .map_err(|err| ApiError::validation(source, err))
}

fn metadata<T>(forecast: &Forecast<T>) -> CacheMetadata {
    CacheMetadata {
        cached: forecast.cached,
        cache_age: u64::try_from(forecast.cache_age.as_millis()).unwrap_or(u64::MAX),
        last_updated: forecast.last_updated,
    }
}

fn with_cache_status(body: impl IntoResponse, cached: bool) -> Response {
    let status = if cached { "hit" } else { "miss" };
    (
        [(HeaderName::from_static(CACHE_STATUS_HEADER), status)],
        body,
    )
        .into_response()
}
