//! Bounded admission for simultaneous downloads.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Counting semaphore admitting a fixed number of concurrent operations.
///
/// Waiters are served in FIFO order. The permit is held for the whole of
/// the wrapped operation and released on every exit path, including
/// cancellation, because it lives on the stack of the awaiting future.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    permits: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run `op` once a permit is available.
    pub async fn with_limit<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("limiter semaphore is never closed");
        op().await
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}
