//! Process-wide memory pressure notification.
//!
//! The host bridges its platform's low-memory signal to [`notify`]; the
//! engine reacts by dropping its volatile tier. Listeners are detached by
//! dropping their subscription, never by forgetting to unregister.
//!
//! [`notify`]: MemoryPressureNotifier::notify

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct NotifierInner {
    listeners: Mutex<HashMap<u64, Listener>>,
    next_id: AtomicU64,
}

/// Fan-out point for memory pressure signals.
#[derive(Clone, Default)]
pub struct MemoryPressureNotifier {
    inner: Arc<NotifierInner>,
}

impl MemoryPressureNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it stays active until the returned
    /// subscription is dropped.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> PressureSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .expect("pressure listener lock")
            .insert(id, Arc::new(listener));
        PressureSubscription { id, inner: Arc::downgrade(&self.inner) }
    }

    /// Invoke every live listener.
    pub fn notify(&self) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .expect("pressure listener lock")
            .values()
            .cloned()
            .collect();
        debug!(listeners = listeners.len(), "memory pressure signalled");
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .expect("pressure listener lock")
            .len()
    }
}

/// Handle keeping one pressure listener registered.
pub struct PressureSubscription {
    id: u64,
    inner: Weak<NotifierInner>,
}

impl Drop for PressureSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .listeners
                .lock()
                .expect("pressure listener lock")
                .remove(&self.id);
        }
    }
}
