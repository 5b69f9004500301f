//! In-process forecast store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use metrics::{counter, gauge};
use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::domain::series::ForecastPayload;

use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_ENTRIES: &str = "solar_sentinel_cache_entries";
pub(crate) const METRIC_SWEEP_EVICTED: &str = "solar_sentinel_cache_sweep_evicted_total";

/// A stored payload and the instant it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub payload: ForecastPayload,
    pub stored_at: OffsetDateTime,
}

impl CacheEntry {
    pub fn stored_at_millis(&self) -> i64 {
        i64::try_from(self.stored_at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
    }

    /// Time elapsed since the entry was stored; zero if the clock went backwards.
    pub fn age(&self, now: OffsetDateTime) -> Duration {
        Duration::try_from(now - self.stored_at).unwrap_or_default()
    }
}

/// Map from [`CacheKey`] to the latest payload for that key.
///
/// There is no TTL: entries are replaced by refreshes and removed only by
/// [`ForecastStore::sweep_expired`] or [`ForecastStore::delete`].
#[derive(Debug, Default)]
pub struct ForecastStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ForecastStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        rw_read(&self.entries, SOURCE, "get").get(key).cloned()
    }

    /// Store `payload` stamped with the current time, replacing any previous entry.
    pub fn set(&self, key: CacheKey, payload: ForecastPayload) -> CacheEntry {
        self.set_at(key, payload, OffsetDateTime::now_utc())
    }

    pub fn set_at(
        &self,
        key: CacheKey,
        payload: ForecastPayload,
        stored_at: OffsetDateTime,
    ) -> CacheEntry {
        let entry = CacheEntry { payload, stored_at };
        let mut entries = rw_write(&self.entries, SOURCE, "set");
        entries.insert(key, entry.clone());
        gauge!(METRIC_CACHE_ENTRIES).set(entries.len() as f64);
        entry
    }

    pub fn delete(&self, key: &CacheKey) -> bool {
        let mut entries = rw_write(&self.entries, SOURCE, "delete");
        let removed = entries.remove(key).is_some();
        gauge!(METRIC_CACHE_ENTRIES).set(entries.len() as f64);
        removed
    }

    /// Remove every entry whose target date precedes `today`.
    pub fn sweep_expired(&self, today: Date) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "sweep_expired");
        let before = entries.len();
        entries.retain(|key, _| key.date() >= today);
        let removed = before - entries.len();
        gauge!(METRIC_CACHE_ENTRIES).set(entries.len() as f64);
        counter!(METRIC_SWEEP_EVICTED).increment(removed as u64);
        debug!(
            target = "cache::store",
            removed,
            remaining = entries.len(),
            "swept expired forecast entries"
        );
        removed
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::domain::location::Location;
    use crate::domain::series::{DailySummary, SeriesKind};

    fn key(date: Date) -> CacheKey {
        let location = Location::new(40.72, -74.36).expect("location");
        CacheKey::new(SeriesKind::Daily, &location, date)
    }

    fn payload(date: &str) -> ForecastPayload {
        ForecastPayload::Daily(DailySummary {
            date: date.to_string(),
            temp_max: Some(45.0),
            temp_min: Some(30.0),
            uv_max: Some(3.2),
            precip_max: Some(10.0),
            humidity_max: Some(80.0),
        })
    }

    #[test]
    fn set_overwrites_and_get_returns_latest() {
        let store = ForecastStore::new();
        let k = key(date!(2025 - 01 - 15));
        store.set_at(k, payload("first"), datetime!(2025-01-15 10:00 UTC));
        store.set_at(k, payload("second"), datetime!(2025-01-15 11:00 UTC));

        let entry = store.get(&k).expect("entry");
        assert_eq!(entry.payload, payload("second"));
        assert_eq!(entry.stored_at, datetime!(2025-01-15 11:00 UTC));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_reports_presence() {
        let store = ForecastStore::new();
        let k = key(date!(2025 - 01 - 15));
        assert!(!store.delete(&k));
        store.set(k, payload("x"));
        assert!(store.delete(&k));
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_removes_only_past_dates_and_is_idempotent() {
        let store = ForecastStore::new();
        store.set(key(date!(2025 - 01 - 13)), payload("a"));
        store.set(key(date!(2025 - 01 - 14)), payload("b"));
        store.set(key(date!(2025 - 01 - 15)), payload("c"));
        store.set(key(date!(2025 - 01 - 20)), payload("d"));

        let today = date!(2025 - 01 - 15);
        assert_eq!(store.sweep_expired(today), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.sweep_expired(today), 0);
        assert_eq!(store.len(), 2);
        assert!(store.get(&key(today)).is_some());
    }

    #[test]
    fn age_and_millis_follow_stored_at() {
        let entry = CacheEntry {
            payload: payload("x"),
            stored_at: datetime!(2025-01-15 12:00:00 UTC),
        };
        let now = datetime!(2025-01-15 12:00:01.5 UTC);
        assert_eq!(entry.age(now), Duration::from_millis(1500));
        assert_eq!(entry.age(datetime!(2025-01-15 11:00 UTC)), Duration::ZERO);
        assert_eq!(entry.stored_at_millis(), 1_736_942_400_000);
    }
}
