//! Query parameter validation for the forecast endpoints.

use thiserror::Error;
use time::{Date, Duration, OffsetDateTime};

use crate::application::forecast::ForecastRequest;
use crate::domain::location::Location;
use crate::util::date::parse_iso_date;
use crate::util::timezone::reference_today;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid coordinates")]
    InvalidCoordinates,
    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDateFormat,
    #[error("Date must be between today and {horizon_days} days from today")]
    DateOutOfRange { horizon_days: u16 },
    #[error("Invalid timestamp")]
    InvalidTimestamp,
    #[error("Invalid query string")]
    MalformedQuery,
}

/// Turns raw query strings into a [`ForecastRequest`].
///
/// Absent or empty parameters fall back to the configured home location and
/// to today in the reference timezone.
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator {
    default_location: Location,
    horizon_days: u16,
}

impl RequestValidator {
    pub fn new(default_location: Location, horizon_days: u16) -> Self {
        Self {
            default_location,
            horizon_days,
        }
    }

    pub fn forecast_request(
        &self,
        lat: Option<&str>,
        lon: Option<&str>,
        date: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<ForecastRequest, ValidationError> {
        let latitude = parse_coordinate(lat, self.default_location.latitude())?;
        let longitude = parse_coordinate(lon, self.default_location.longitude())?;
        let location =
            Location::new(latitude, longitude).map_err(|_| ValidationError::InvalidCoordinates)?;

        let today = reference_today(now);
        let date = match present(date) {
            Some(raw) => parse_iso_date(raw).ok_or(ValidationError::InvalidDateFormat)?,
            None => today,
        };

        let last = today
            .checked_add(Duration::days(i64::from(self.horizon_days)))
            .unwrap_or(Date::MAX);
        if date < today || date > last {
            return Err(ValidationError::DateOutOfRange {
                horizon_days: self.horizon_days,
            });
        }

        Ok(ForecastRequest { location, date })
    }

    pub fn poll_timestamp(&self, raw: Option<&str>) -> Result<i64, ValidationError> {
        present(raw)
            .and_then(|value| value.parse::<i64>().ok())
            .ok_or(ValidationError::InvalidTimestamp)
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_coordinate(raw: Option<&str>, default: f64) -> Result<f64, ValidationError> {
    match present(raw) {
        Some(value) => value
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidCoordinates),
        None => Ok(default),
    }
}
