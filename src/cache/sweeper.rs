use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::util::timezone::reference_today;

use super::store::ForecastStore;

/// Periodically drops entries for dates that are already in the past.
#[derive(Clone)]
pub struct CacheSweeper {
    store: Arc<ForecastStore>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(store: Arc<ForecastStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn sweep_now(&self) -> usize {
        let today = reference_today(OffsetDateTime::now_utc());
        self.store.sweep_expired(today)
    }

    /// Sweep once immediately, then on every interval until `shutdown` fires.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = self.sweep_now();
                        info!(
                            target = "cache::sweeper",
                            removed,
                            remaining = self.store.len(),
                            "forecast cache sweep finished"
                        );
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use time::Duration as TimeDuration;

    use super::*;
    use crate::cache::keys::CacheKey;
    use crate::domain::location::Location;
    use crate::domain::series::{DailySummary, ForecastPayload, SeriesKind};

    fn insert(store: &ForecastStore, offset_days: i64) {
        let today = reference_today(OffsetDateTime::now_utc());
        let date = today + TimeDuration::days(offset_days);
        let location = Location::new(40.72, -74.36).expect("location");
        store.set(
            CacheKey::new(SeriesKind::Daily, &location, date),
            ForecastPayload::Daily(DailySummary {
                date: date.to_string(),
                temp_max: None,
                temp_min: None,
                uv_max: None,
                precip_max: None,
                humidity_max: None,
            }),
        );
    }

    #[tokio::test]
    async fn startup_sweep_runs_before_cancellation() {
        let store = Arc::new(ForecastStore::new());
        insert(&store, -2);
        insert(&store, -1);
        insert(&store, 0);
        insert(&store, 3);

        let shutdown = CancellationToken::new();
        let handle = CacheSweeper::new(store.clone(), Duration::from_secs(3600))
            .spawn(shutdown.clone());

        for _ in 0..50 {
            if store.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.len(), 2);

        shutdown.cancel();
        handle.await.expect("sweeper task joins");
    }
}
