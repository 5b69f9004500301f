//! Cache-first forecast orchestration.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use metrics::counter;
use thiserror::Error;
use time::{Date, OffsetDateTime};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::application::transform::{TransformError, daily_summary, hourly_series};
use crate::cache::{CacheEntry, CacheKey, ForecastStore, InFlight};
use crate::domain::location::Location;
use crate::domain::series::{
    DailySummary, ForecastPayload, HourlySeries, Series, SeriesKind,
};
use crate::infra::upstream::{ForecastSource, UpstreamError, UpstreamQuery};
use crate::util::timezone::{forecast_timezone, reference_today};

pub(crate) const METRIC_CACHE_HIT: &str = "solar_sentinel_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "solar_sentinel_cache_miss_total";
pub(crate) const METRIC_REFRESH: &str = "solar_sentinel_refresh_total";
pub(crate) const METRIC_REFRESH_FAILED: &str = "solar_sentinel_refresh_failed_total";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ForecastError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("cached entry for {key} holds a {found} series")]
    KindMismatch { key: String, found: SeriesKind },
}

/// One validated forecast lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub location: Location,
    pub date: Date,
}

/// A series together with its cache provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast<T> {
    pub payload: T,
    pub cached: bool,
    pub cache_age: Duration,
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollStatus {
    pub has_update: bool,
    pub timestamp: Option<i64>,
}

type FetchOutcome = Result<CacheEntry, ForecastError>;

/// Serves forecasts from the store, falling back to the upstream source on a
/// miss and refreshing hits in the background.
pub struct ForecastService {
    source: Arc<dyn ForecastSource>,
    store: Arc<ForecastStore>,
    inflight: InFlight<FetchOutcome>,
    background: TaskTracker,
    refresh_after: Duration,
}

impl ForecastService {
    pub fn new(source: Arc<dyn ForecastSource>, store: Arc<ForecastStore>) -> Self {
        let background = TaskTracker::new();
        Self {
            source,
            store,
            inflight: InFlight::with_tracker(background.clone()),
            background,
            refresh_after: Duration::ZERO,
        }
    }

    /// Only refresh hits whose entry is at least this old.
    pub fn with_refresh_after(mut self, refresh_after: Duration) -> Self {
        self.refresh_after = refresh_after;
        self
    }

    pub fn store(&self) -> &Arc<ForecastStore> {
        &self.store
    }

    pub async fn hourly(
        &self,
        request: ForecastRequest,
    ) -> Result<Forecast<HourlySeries>, ForecastError> {
        self.serve(request).await
    }

    pub async fn daily(
        &self,
        request: ForecastRequest,
    ) -> Result<Forecast<DailySummary>, ForecastError> {
        self.serve(request).await
    }

    /// Compare a client-held timestamp (epoch millis) with the stored hourly entry.
    pub fn poll(&self, request: ForecastRequest, client_timestamp_ms: i64) -> PollStatus {
        let key = CacheKey::new(SeriesKind::Hourly, &request.location, request.date);
        match self.store.get(&key) {
            Some(entry) => {
                let stored_ms = entry.stored_at_millis();
                PollStatus {
                    has_update: stored_ms > client_timestamp_ms,
                    timestamp: Some(stored_ms),
                }
            }
            None => PollStatus {
                has_update: false,
                timestamp: None,
            },
        }
    }

    /// Wait until every background refresh and upstream fetch started so far
    /// has finished.
    pub async fn wait_for_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Stop accepting background work and wait for outstanding refreshes.
    pub async fn shutdown(&self) {
        self.background.close();
        self.background.wait().await;
    }

    async fn serve<T: Series>(&self, request: ForecastRequest) -> Result<Forecast<T>, ForecastError> {
        let now = OffsetDateTime::now_utc();
        let key = CacheKey::new(T::KIND, &request.location, request.date);

        if let Some(entry) = self.store.get(&key) {
            counter!(METRIC_CACHE_HIT, "kind" => T::KIND.as_str()).increment(1);
            let age = entry.age(now);
            if self.should_refresh(&key, age, now) {
                self.spawn_refresh(key, request);
            }
            return Ok(Forecast {
                payload: typed_payload(&key, &entry.payload)?,
                cached: true,
                cache_age: age,
                last_updated: entry.stored_at,
            });
        }

        counter!(METRIC_CACHE_MISS, "kind" => T::KIND.as_str()).increment(1);
        debug!(
            target = "application::forecast::serve",
            key = %key,
            "forecast cache miss"
        );
        let entry = self.fetch_shared(key, request).await?;
        Ok(Forecast {
            payload: typed_payload(&key, &entry.payload)?,
            cached: false,
            cache_age: Duration::ZERO,
            last_updated: entry.stored_at,
        })
    }

    fn should_refresh(&self, key: &CacheKey, age: Duration, now: OffsetDateTime) -> bool {
        key.date() >= reference_today(now)
            && age >= self.refresh_after
            && !self.inflight.is_pending(key)
    }

    fn spawn_refresh(&self, key: CacheKey, request: ForecastRequest) {
        counter!(METRIC_REFRESH, "kind" => key.kind().as_str()).increment(1);
        let refresh = self.fetch_shared(key, request);
        self.background.spawn(async move {
            match refresh.await {
                Ok(_) => debug!(
                    target = "application::forecast::refresh",
                    key = %key,
                    "background refresh stored new entry"
                ),
                Err(err) => {
                    counter!(METRIC_REFRESH_FAILED, "kind" => key.kind().as_str()).increment(1);
                    warn!(
                        target = "application::forecast::refresh",
                        key = %key,
                        error = %err,
                        "background refresh failed; keeping previous entry"
                    );
                }
            }
        });
    }

    fn fetch_shared(
        &self,
        key: CacheKey,
        request: ForecastRequest,
    ) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let source = Arc::clone(&self.source);
        let store = Arc::clone(&self.store);
        self.inflight
            .run(key, move || fetch_entry(source, store, key, request))
    }
}

fn typed_payload<T: Series>(key: &CacheKey, payload: &ForecastPayload) -> Result<T, ForecastError> {
    T::from_payload(payload).ok_or_else(|| ForecastError::KindMismatch {
        key: key.to_string(),
        found: payload.kind(),
    })
}

fn fetch_entry(
    source: Arc<dyn ForecastSource>,
    store: Arc<ForecastStore>,
    key: CacheKey,
    request: ForecastRequest,
) -> BoxFuture<'static, FetchOutcome> {
    async move {
        let query = UpstreamQuery {
            latitude: request.location.latitude(),
            longitude: request.location.longitude(),
            timezone: forecast_timezone(request.location.longitude()),
        };

        let payload = match key.kind() {
            SeriesKind::Hourly => {
                let raw = source.fetch_hourly(&query).await?;
                hourly_series(&raw.hourly, key.date()).into_payload()
            }
            SeriesKind::Daily => {
                let raw = source.fetch_daily(&query).await?;
                daily_summary(&raw.daily, key.date())?.into_payload()
            }
        };

        Ok::<_, ForecastError>(store.set(key, payload))
    }
    .boxed()
}
