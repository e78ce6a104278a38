//! Single-flight collapsing of concurrent downloads.
//!
//! At most one fetch runs per fingerprint; every caller arriving while it
//! is in flight awaits the same shared future and observes the identical
//! outcome. The table keeps only a weak handle to that future, so the
//! callers themselves carry the reference count: when the last joiner
//! drops its handle, the underlying work is dropped with it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::{BoxFuture, Shared, WeakShared};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{ImageError, ImageResult};
use crate::fingerprint::Fingerprint;

type FetchOutcome = ImageResult<Bytes>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;
type WeakFetch = WeakShared<BoxFuture<'static, FetchOutcome>>;

struct InFlightEntry {
    future: WeakFetch,
    token: CancellationToken,
}

/// Guarantees at-most-one in-flight fetch per fingerprint.
#[derive(Clone, Default)]
pub struct Deduplicator {
    in_flight: Arc<Mutex<HashMap<Fingerprint, InFlightEntry>>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fetch` for the URL, or join the fetch already in flight.
    ///
    /// The installed future removes its own table entry before resolving,
    /// so joiners only ever observe the result after cleanup, and cleanup
    /// runs exactly once per entry. Lookup and installation happen under
    /// one lock acquisition; two racing callers can never install twice.
    pub async fn run<F, Fut>(&self, url: &str, fetch: F) -> FetchOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        let fingerprint = Fingerprint::for_url(url);

        let shared = {
            let mut table = self.in_flight.lock().expect("in-flight table lock");
            match table
                .get(&fingerprint)
                .and_then(|entry| entry.future.upgrade())
            {
                Some(existing) => {
                    debug!(%fingerprint, "joining in-flight download");
                    existing
                }
                None => self.install_locked(&mut table, fingerprint.clone(), fetch()),
            }
        };

        shared.await
    }

    /// Cancel the in-flight fetch for a URL; all joiners observe
    /// [`ImageError::Cancelled`].
    pub fn cancel(&self, url: &str) {
        let fingerprint = Fingerprint::for_url(url);
        let table = self.in_flight.lock().expect("in-flight table lock");
        if let Some(entry) = table.get(&fingerprint) {
            debug!(%fingerprint, "cancelling in-flight download");
            entry.token.cancel();
        }
    }

    /// Cancel every in-flight fetch.
    pub fn cancel_all(&self) {
        let table = self.in_flight.lock().expect("in-flight table lock");
        for entry in table.values() {
            entry.token.cancel();
        }
    }

    /// Number of fetches currently in flight (stale entries whose last
    /// joiner vanished are not counted).
    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .expect("in-flight table lock")
            .values()
            .filter(|entry| entry.future.upgrade().is_some())
            .count()
    }

    fn install_locked<Fut>(
        &self,
        table: &mut HashMap<Fingerprint, InFlightEntry>,
        fingerprint: Fingerprint,
        work: Fut,
    ) -> SharedFetch
    where
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        let token = CancellationToken::new();
        let guard_token = token.clone();
        let cleanup_table = Arc::clone(&self.in_flight);
        let cleanup_key = fingerprint.clone();

        let shared = async move {
            let outcome = tokio::select! {
                _ = guard_token.cancelled() => Err(ImageError::Cancelled),
                outcome = work => outcome,
            };
            cleanup_table
                .lock()
                .expect("in-flight table lock")
                .remove(&cleanup_key);
            outcome
        }
        .boxed()
        .shared();

        if let Some(weak) = shared.downgrade() {
            table.insert(fingerprint, InFlightEntry { future: weak, token });
        }
        shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    const URL: &str = "https://images.example.com/banner.jpg";

    #[tokio::test]
    async fn concurrent_callers_share_a_single_fetch() {
        let dedup = Deduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let dedup = dedup.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                dedup
                    .run(URL, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(Bytes::from_static(b"pixels"))
                    })
                    .await
            }));
        }

        for handle in handles {
            let bytes = handle.await.unwrap().unwrap();
            assert_eq!(&bytes[..], b"pixels");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn every_joiner_observes_the_same_error() {
        let dedup = Deduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let dedup = dedup.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                dedup
                    .run(URL, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err(ImageError::InvalidResponse(404))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap_err(), ImageError::InvalidResponse(404));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn sequential_runs_fetch_again() {
        let dedup = Deduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            dedup
                .run(URL, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Bytes::from_static(b"fresh"))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancel_surfaces_cancelled_to_joiners() {
        let dedup = Deduplicator::new();

        let joiner = {
            let dedup = dedup.clone();
            tokio::spawn(async move {
                dedup
                    .run(URL, || async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(Bytes::new())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        dedup.cancel(URL);
        assert_eq!(joiner.await.unwrap().unwrap_err(), ImageError::Cancelled);
        assert_eq!(dedup.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn dropping_the_last_joiner_drops_the_work() {
        struct DropFlag(Arc<AtomicBool>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let dedup = Deduplicator::new();
        let dropped = Arc::new(AtomicBool::new(false));

        let sole_joiner = {
            let dedup = dedup.clone();
            let flag = DropFlag(dropped.clone());
            tokio::spawn(async move {
                dedup
                    .run(URL, move || async move {
                        let _flag = flag;
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(Bytes::new())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(dedup.in_flight_count(), 1);

        sole_joiner.abort();
        let _ = sole_joiner.await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(dropped.load(Ordering::SeqCst), "fetch future should be dropped");
        assert_eq!(dedup.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn a_stale_entry_is_replaced_by_the_next_run() {
        let dedup = Deduplicator::new();

        let abandoned = {
            let dedup = dedup.clone();
            tokio::spawn(async move {
                dedup
                    .run(URL, || async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(Bytes::new())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        abandoned.abort();
        let _ = abandoned.await;

        let bytes = dedup
            .run(URL, || async { Ok(Bytes::from_static(b"second attempt")) })
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"second attempt");
    }
}
