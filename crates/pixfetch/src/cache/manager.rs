//! Orchestration of the memory tier, disk tier, and downloader.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cache::disk::DiskCache;
use crate::cache::memory::MemoryCache;
use crate::cache::stats::CacheStats;
use crate::config::EngineConfig;
use crate::download::downloader::{Downloader, ProgressSink};
use crate::errors::ImageResult;
use crate::fingerprint::Fingerprint;
use crate::image_data::DecodedImage;
use crate::pressure::{MemoryPressureNotifier, PressureSubscription};

/// Per-call options for [`CacheManager::load`].
///
/// Passed by value at each call site; view-level concerns (placeholder
/// builders, per-view manager overrides) stay outside the core.
#[derive(Clone)]
pub struct LoadOptions {
    /// When false, the load neither consults nor populates the caches.
    pub cache_enabled: bool,
    /// Receives download progress when present.
    pub progress: Option<ProgressSink>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { cache_enabled: true, progress: None }
    }
}

impl LoadOptions {
    /// Bypass the caches entirely, both on lookup and on store.
    pub fn uncached() -> Self {
        Self { cache_enabled: false, progress: None }
    }

    pub fn with_progress(sink: ProgressSink) -> Self {
        Self { cache_enabled: true, progress: Some(sink) }
    }
}

/// Public face of the engine: resolves URLs through memory, disk, and
/// the network, promoting and write-through-caching along the way.
#[derive(Clone)]
pub struct CacheManager {
    memory: MemoryCache,
    disk: DiskCache,
    downloader: Downloader,
}

impl CacheManager {
    pub async fn new(config: EngineConfig) -> Result<Self> {
        let downloader = Downloader::new(config.download.clone())?;
        Self::with_downloader(config, downloader).await
    }

    /// Construct over an existing (possibly shared) downloader.
    pub async fn with_downloader(config: EngineConfig, downloader: Downloader) -> Result<Self> {
        let memory = MemoryCache::new(config.memory);
        let disk = DiskCache::open(config.disk).await?;
        Ok(Self { memory, disk, downloader })
    }

    /// Cache-only lookup: memory first, then disk with promotion.
    ///
    /// A disk hit lands in the memory tier before this returns, so a
    /// second caller arriving afterwards sees a memory hit.
    pub async fn get(&self, url: &str) -> Option<DecodedImage> {
        let fingerprint = Fingerprint::for_url(url);
        if let Some(image) = self.memory.get(&fingerprint).await {
            return Some(image);
        }
        let image = self.disk.get(&fingerprint).await?;
        debug!(%fingerprint, "disk hit, promoting to memory");
        self.memory.put(fingerprint, image.clone()).await;
        Some(image)
    }

    /// Write-through store into both tiers.
    ///
    /// Caching is an optimization: a disk failure is logged and swallowed
    /// so the in-memory copy still serves.
    pub async fn put(&self, url: &str, image: DecodedImage) {
        let fingerprint = Fingerprint::for_url(url);
        self.memory.put(fingerprint.clone(), image.clone()).await;
        if let Err(err) = self.disk.put(&fingerprint, &image).await {
            warn!(%fingerprint, "disk store failed, entry stays memory-only: {err:#}");
        }
    }

    /// Resolve a URL to an image: caches first, then the network.
    pub async fn load(&self, url: &str, options: LoadOptions) -> ImageResult<DecodedImage> {
        if !options.cache_enabled {
            return self.downloader.load_image(url, options.progress).await;
        }
        if let Some(image) = self.get(url).await {
            return Ok(image);
        }
        let image = self.downloader.load_image(url, options.progress).await?;
        self.put(url, image.clone()).await;
        Ok(image)
    }

    /// Warm the cache for the given URLs in detached background jobs.
    ///
    /// Each job runs the full load pipeline (so results are cached) and
    /// swallows its errors; nothing surfaces to the caller.
    pub fn prefetch<S: AsRef<str>>(&self, urls: &[S]) {
        for url in urls {
            let url = url.as_ref().to_string();
            let manager = self.clone();
            let job_url = url.clone();
            self.downloader.spawn_prefetch(&url, async move {
                match manager.load(&job_url, LoadOptions::default()).await {
                    Ok(_) => debug!(url = %job_url, "prefetch complete"),
                    Err(err) => debug!(url = %job_url, "prefetch dropped: {err}"),
                }
            });
        }
    }

    /// Cancel prefetch jobs; concurrent foreground loads are untouched.
    pub fn cancel_prefetch<S: AsRef<str>>(&self, urls: &[S]) {
        self.downloader.cancel_prefetch(urls);
    }

    pub async fn remove(&self, url: &str) {
        let fingerprint = Fingerprint::for_url(url);
        self.memory.remove(&fingerprint).await;
        if let Err(err) = self.disk.remove(&fingerprint).await {
            warn!(%fingerprint, "disk removal failed: {err:#}");
        }
    }

    pub async fn clear(&self) {
        self.memory.clear().await;
        if let Err(err) = self.disk.clear().await {
            warn!("disk clear failed: {err:#}");
        }
        info!("cache cleared");
    }

    /// Bytes persisted on disk; the memory tier is volatile and excluded.
    pub async fn byte_size(&self) -> i64 {
        self.disk.byte_size().await
    }

    pub async fn memory_stats(&self) -> CacheStats {
        self.memory.stats().await
    }

    pub async fn disk_stats(&self) -> CacheStats {
        self.disk.stats().await
    }

    /// Clear the memory tier whenever the notifier signals pressure.
    ///
    /// The hook stays attached for the lifetime of the returned
    /// subscription; dropping it detaches.
    pub fn attach_pressure(&self, notifier: &MemoryPressureNotifier) -> PressureSubscription {
        let memory = self.memory.clone();
        notifier.subscribe(move || {
            let memory = memory.clone();
            tokio::spawn(async move {
                memory.clear().await;
                debug!("memory cache cleared on pressure signal");
            });
        })
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn disk(&self) -> &DiskCache {
        &self.disk
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }
}
