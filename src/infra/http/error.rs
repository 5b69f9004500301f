use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use solar_sentinel_api_types::ErrorBody;

use crate::application::error::ErrorReport;
use crate::application::forecast::ForecastError;
use crate::domain::series::SeriesKind;

use super::validation::ValidationError;

const HOURLY_FAILURE: &str = "Failed to fetch UV data. Please try again later.";
const DAILY_FAILURE: &str = "Failed to fetch daily summary data. Please try again later.";

/// JSON `{ "error": ... }` response carrying an [`ErrorReport`] for logging.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    report: ErrorReport,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn validation(source: &'static str, error: ValidationError) -> Self {
        let status = StatusCode::BAD_REQUEST;
        Self {
            status,
            message: error.to_string(),
            report: ErrorReport::from_error(source, status, &error),
        }
    }

    /// A query string that does not deserialize at all, such as one repeating a key.
    pub fn query(source: &'static str, rejection: QueryRejection) -> Self {
        let status = StatusCode::BAD_REQUEST;
        Self {
            status,
            message: ValidationError::MalformedQuery.to_string(),
            report: ErrorReport::from_error(source, status, &rejection),
        }
    }

    /// Upstream and transform failures share a generic per-endpoint message.
    pub fn forecast(source: &'static str, kind: SeriesKind, error: &ForecastError) -> Self {
        let status = StatusCode::BAD_GATEWAY;
        let message = match kind {
            SeriesKind::Hourly => HOURLY_FAILURE,
            SeriesKind::Daily => DAILY_FAILURE,
        };
        Self {
            status,
            message: message.to_string(),
            report: ErrorReport::from_error(source, status, error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
