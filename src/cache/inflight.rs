//! Per-key request coalescing.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio_util::task::TaskTracker;
use tracing::debug;

use super::keys::CacheKey;

type SharedFetch<T> = Shared<BoxFuture<'static, T>>;

/// Tracks fetches currently running for a key so concurrent callers share one
/// upstream request.
///
/// Every fetch is driven to completion on `drivers`, so a slot is released even
/// when all of its callers have been dropped.
pub struct InFlight<T: Clone> {
    pending: Arc<DashMap<CacheKey, SharedFetch<T>>>,
    drivers: TaskTracker,
}

impl<T: Clone> Clone for InFlight<T> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
            drivers: self.drivers.clone(),
        }
    }
}

impl<T: Clone> Default for InFlight<T> {
    fn default() -> Self {
        Self::with_tracker(TaskTracker::new())
    }
}

impl<T: Clone> InFlight<T> {
    /// Drive fetches on `drivers` so whoever owns the tracker can wait for them.
    pub fn with_tracker(drivers: TaskTracker) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            drivers,
        }
    }
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the fetch already running for `key`, or start one with `start`.
    ///
    /// The slot is released once the fetch resolves, so a later call after
    /// completion starts a fresh fetch. Must be called within a tokio runtime.
    pub fn run<F>(&self, key: CacheKey, start: F) -> impl Future<Output = T> + Send + 'static
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let shared = match self.pending.entry(key) {
            Entry::Occupied(occupied) => {
                debug!(
                    target = "cache::inflight",
                    key = %key,
                    "joining in-flight forecast fetch"
                );
                occupied.get().clone()
            }
            Entry::Vacant(vacant) => {
                let shared = start().shared();
                vacant.insert(shared.clone());
                self.drive(key, shared.clone());
                shared
            }
        };

        let pending = Arc::clone(&self.pending);
        async move {
            let output = shared.clone().await;
            release(&pending, &key, &shared);
            output
        }
    }

    pub fn is_pending(&self, key: &CacheKey) -> bool {
        self.pending.contains_key(key)
    }

    fn drive(&self, key: CacheKey, shared: SharedFetch<T>) {
        let pending = Arc::clone(&self.pending);
        self.drivers.spawn(async move {
            shared.clone().await;
            release(&pending, &key, &shared);
        });
    }
}

fn release<T: Clone>(
    pending: &DashMap<CacheKey, SharedFetch<T>>,
    key: &CacheKey,
    shared: &SharedFetch<T>,
) {
    pending.remove_if(key, |_, current| current.ptr_eq(shared));
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use time::macros::date;
    use tokio::sync::Notify;

    use super::*;
    use crate::domain::location::Location;
    use crate::domain::series::SeriesKind;

    fn key() -> CacheKey {
        let location = Location::new(40.72, -74.36).expect("location");
        CacheKey::new(SeriesKind::Hourly, &location, date!(2025 - 01 - 15))
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let inflight = InFlight::<u32>::new();
        let starts = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let start = |starts: Arc<AtomicUsize>, gate: Arc<Notify>| {
            move || {
                starts.fetch_add(1, Ordering::SeqCst);
                async move {
                    gate.notified().await;
                    7_u32
                }
                .boxed()
            }
        };

        let first = inflight.run(key(), start(starts.clone(), gate.clone()));
        let second = inflight.run(key(), start(starts.clone(), gate.clone()));
        assert!(inflight.is_pending(&key()));

        gate.notify_one();
        let (a, b) = tokio::join!(first, second);
        assert_eq!((a, b), (7, 7));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(!inflight.is_pending(&key()));
    }

    #[tokio::test]
    async fn completed_fetch_releases_the_slot() {
        let inflight = InFlight::<u32>::new();
        assert_eq!(inflight.run(key(), || async { 1 }.boxed()).await, 1);
        assert_eq!(inflight.run(key(), || async { 2 }.boxed()).await, 2);
    }

    #[tokio::test]
    async fn dropped_caller_still_finishes_and_releases_the_slot() {
        let drivers = TaskTracker::new();
        let inflight = InFlight::<u32>::with_tracker(drivers.clone());
        let finished = Arc::new(AtomicUsize::new(0));

        let done = finished.clone();
        let caller = inflight.run(key(), move || {
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                done.fetch_add(1, Ordering::SeqCst);
                3_u32
            }
            .boxed()
        });
        assert!(
            tokio::time::timeout(Duration::from_millis(5), caller)
                .await
                .is_err()
        );
        assert!(inflight.is_pending(&key()));

        drivers.close();
        drivers.wait().await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(!inflight.is_pending(&key()));

        let fresh = inflight.run(key(), || async { 4 }.boxed()).await;
        assert_eq!(fresh, 4);
    }
}
