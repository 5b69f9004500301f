use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::forecast::{
    METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_REFRESH, METRIC_REFRESH_FAILED,
};
use crate::cache::{METRIC_CACHE_ENTRIES, METRIC_SWEEP_EVICTED};
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::upstream::METRIC_UPSTREAM_REQUEST_MS;

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Forecast requests answered from the cache."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Forecast requests that required a synchronous upstream fetch."
        );
        describe_counter!(
            METRIC_REFRESH,
            Unit::Count,
            "Background refreshes started after a cache hit."
        );
        describe_counter!(
            METRIC_REFRESH_FAILED,
            Unit::Count,
            "Background refreshes that failed and kept the previous entry."
        );
        describe_histogram!(
            METRIC_UPSTREAM_REQUEST_MS,
            Unit::Milliseconds,
            "Upstream forecast request latency in milliseconds."
        );
        describe_gauge!(
            METRIC_CACHE_ENTRIES,
            Unit::Count,
            "Current number of entries in the forecast store."
        );
        describe_counter!(
            METRIC_SWEEP_EVICTED,
            Unit::Count,
            "Entries removed by the expiry sweep."
        );
    });
}
