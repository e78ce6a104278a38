//! Bounded in-memory LRU over decoded images.

use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::stats::CacheStats;
use crate::config::MemoryCacheConfig;
use crate::fingerprint::Fingerprint;
use crate::image_data::DecodedImage;

struct MemoryRecord {
    image: DecodedImage,
    cost: usize,
}

struct MemoryState {
    entries: LruCache<Fingerprint, MemoryRecord>,
    total_cost: usize,
    stats: CacheStats,
}

/// Cost- and count-bounded LRU cache of decoded images.
///
/// Eviction is strictly by last access; `get` refreshes recency while
/// `contains` deliberately does not. Returned images share their pixel
/// storage, so an entry evicted mid-read stays valid for the reader.
#[derive(Clone)]
pub struct MemoryCache {
    state: Arc<Mutex<MemoryState>>,
    config: MemoryCacheConfig,
}

impl MemoryCache {
    pub fn new(config: MemoryCacheConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                entries: LruCache::unbounded(),
                total_cost: 0,
                stats: CacheStats::new(),
            })),
            config,
        }
    }

    /// Look up an image, refreshing its recency and recording hit/miss.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<DecodedImage> {
        let mut state = self.state.lock().await;
        match state.entries.get(fingerprint) {
            Some(record) => {
                let image = record.image.clone();
                state.stats = state.stats.record_hit();
                Some(image)
            }
            None => {
                state.stats = state.stats.record_miss();
                None
            }
        }
    }

    /// Insert an image, evicting least-recently-used entries until both
    /// the cost and count bounds hold again.
    ///
    /// An image whose own cost exceeds `max_cost_bytes` empties the cache
    /// and is stored alone: the most recently requested image stays
    /// available even when it is over budget by itself.
    pub async fn put(&self, fingerprint: Fingerprint, image: DecodedImage) {
        let cost = image.byte_cost();
        let mut state = self.state.lock().await;
        if let Some(previous) = state.entries.put(fingerprint, MemoryRecord { image, cost }) {
            state.total_cost -= previous.cost;
        }
        state.total_cost += cost;

        while (state.total_cost > self.config.max_cost_bytes
            || state.entries.len() > self.config.max_entries)
            && state.entries.len() > 1
        {
            if let Some((evicted_key, evicted)) = state.entries.pop_lru() {
                state.total_cost -= evicted.cost;
                debug!(fingerprint = %evicted_key, cost = evicted.cost, "evicted image from memory");
            } else {
                break;
            }
        }
    }

    pub async fn remove(&self, fingerprint: &Fingerprint) {
        let mut state = self.state.lock().await;
        if let Some(record) = state.entries.pop(fingerprint) {
            state.total_cost -= record.cost;
        }
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.total_cost = 0;
    }

    /// Existence check that touches neither recency nor the counters.
    pub async fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.state.lock().await.entries.peek(fingerprint).is_some()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    pub async fn total_cost(&self) -> usize {
        self.state.lock().await.total_cost
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.stats
    }
}
