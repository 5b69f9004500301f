mod api;
mod error;
mod middleware;
mod validation;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::StatusCode,
    middleware as axum_middleware,
    routing::get,
};

pub use error::ApiError;
pub use middleware::RequestContext;
pub use validation::{RequestValidator, ValidationError};

use crate::application::forecast::ForecastService;
use crate::infra::assets::{PublicAssets, serve_index, serve_public};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub forecast: Arc<ForecastService>,
    pub validator: RequestValidator,
    pub assets: PublicAssets,
}

impl FromRef<HttpState> for PublicAssets {
    fn from_ref(state: &HttpState) -> Self {
        state.assets.clone()
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/uv-today", get(api::uv_today))
        .route("/api/uv-today/poll", get(api::uv_poll))
        .route("/api/daily-summary", get(api::daily_summary))
        .route("/_health", get(health))
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_public))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
