//! Tracking of detached background prefetch jobs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::AbortHandle;
use tracing::debug;

use crate::fingerprint::Fingerprint;

/// Maps each prefetched fingerprint to the abort handle of its job.
///
/// Cancelling aborts only the registered job; work shared with a
/// foreground caller through the deduplicator keeps running as long as
/// that caller holds its own handle to it.
#[derive(Clone, Default)]
pub struct PrefetchRegistry {
    jobs: Arc<Mutex<HashMap<Fingerprint, AbortHandle>>>,
}

impl PrefetchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job, aborting any previous one for the same fingerprint.
    pub fn add(&self, fingerprint: Fingerprint, handle: AbortHandle) {
        let mut jobs = self.jobs.lock().expect("prefetch registry lock");
        if let Some(previous) = jobs.insert(fingerprint, handle) {
            previous.abort();
        }
    }

    /// Abort and forget the job for a fingerprint.
    pub fn cancel(&self, fingerprint: &Fingerprint) {
        let handle = self
            .jobs
            .lock()
            .expect("prefetch registry lock")
            .remove(fingerprint);
        if let Some(handle) = handle {
            debug!(%fingerprint, "cancelled prefetch job");
            handle.abort();
        }
    }

    pub fn cancel_all(&self) {
        let drained: Vec<AbortHandle> = {
            let mut jobs = self.jobs.lock().expect("prefetch registry lock");
            jobs.drain().map(|(_, handle)| handle).collect()
        };
        for handle in drained {
            handle.abort();
        }
    }

    /// Drop the registration without aborting (job finished on its own).
    pub fn remove(&self, fingerprint: &Fingerprint) {
        self.jobs
            .lock()
            .expect("prefetch registry lock")
            .remove(fingerprint);
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().expect("prefetch registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
