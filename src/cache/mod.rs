//! Forecast cache: keys, the in-process store, request coalescing and the
//! expiry sweeper.

mod inflight;
mod keys;
mod lock;
mod store;
mod sweeper;

pub use inflight::InFlight;
pub use keys::CacheKey;
pub use store::{CacheEntry, ForecastStore};
pub use sweeper::CacheSweeper;

pub(crate) use store::{METRIC_CACHE_ENTRIES, METRIC_SWEEP_EVICTED};
