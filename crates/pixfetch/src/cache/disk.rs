//! Persistent, content-addressed image store with LRU and age eviction.
//!
//! Layout under `<root>/<directory>/`:
//!
//! ```text
//! <fingerprint>.img      JPEG blob at the configured quality
//! access_times.json      fingerprint -> epoch seconds of last read
//! creation_times.json    fingerprint -> epoch seconds of creation
//! ```
//!
//! Blobs and sidecars are always replaced atomically (write to a temp
//! file, then rename), so a crash never leaves a half-written entry
//! behind. All public operations serialize on one internal lock; the
//! directory must be owned by a single store instance.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::stats::CacheStats;
use crate::config::DiskCacheConfig;
use crate::errors::ImageError;
use crate::fingerprint::Fingerprint;
use crate::image_data::DecodedImage;

const ACCESS_TIMES_FILE: &str = "access_times.json";
const CREATION_TIMES_FILE: &str = "creation_times.json";
const BLOB_EXTENSION: &str = "img";

/// Counters from an expiry/eviction pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct HousekeepingStats {
    pub removed_by_age: u64,
    pub removed_by_size: u64,
    pub bytes_freed: u64,
}

/// Metadata snapshot for one stored entry.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub fingerprint: Fingerprint,
    pub byte_size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub last_access_at: Option<DateTime<Utc>>,
}

struct DiskState {
    created: HashMap<String, f64>,
    accessed: HashMap<String, f64>,
    stats: CacheStats,
}

/// Disk-backed image cache surviving process restarts.
#[derive(Clone)]
pub struct DiskCache {
    dir: PathBuf,
    config: DiskCacheConfig,
    state: Arc<Mutex<DiskState>>,
}

impl DiskCache {
    /// Open (or create) the store directory and load its metadata.
    ///
    /// Missing or corrupt sidecars degrade to empty maps; blobs already
    /// on disk then stay orphaned until a `get` on their fingerprint
    /// re-indexes them or a `put` overwrites them. A housekeeping pass
    /// (expiry, then size eviction) is scheduled in the background and
    /// may finish after this returns.
    pub async fn open(config: DiskCacheConfig) -> Result<Self> {
        let dir = config.root.join(&config.directory);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create cache directory {}", dir.display()))?;

        let created = load_time_map(&dir.join(CREATION_TIMES_FILE)).await;
        let accessed = load_time_map(&dir.join(ACCESS_TIMES_FILE)).await;
        debug!(
            dir = %dir.display(),
            entries = created.len(),
            "opened disk cache"
        );

        let cache = Self {
            dir,
            config,
            state: Arc::new(Mutex::new(DiskState {
                created,
                accessed,
                stats: CacheStats::new(),
            })),
        };

        let sweeper = cache.clone();
        tokio::spawn(async move {
            if let Err(err) = sweeper.housekeep().await {
                warn!("startup housekeeping failed: {err:#}");
            }
        });

        Ok(cache)
    }

    /// Read an entry, enforcing expiry and decodability on the way out.
    ///
    /// I/O failures and undecodable blobs are misses, never errors; an
    /// undecodable blob is deleted when observed.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<DecodedImage> {
        let mut state = self.state.lock().await;

        let expired = match (self.config.max_age, state.created.get(fingerprint.as_str()).copied())
        {
            (Some(max_age), Some(created)) => epoch_seconds() - created > max_age.as_secs_f64(),
            _ => false,
        };
        if expired {
            debug!(%fingerprint, "entry expired, purging");
            self.delete_entry_locked(&mut state, fingerprint.as_str()).await;
            if let Err(err) = self.persist_locked(&state).await {
                warn!("failed to persist metadata after expiry: {err:#}");
            }
            state.stats = state.stats.record_miss();
            return None;
        }

        let bytes = match fs::read(self.blob_path(fingerprint.as_str())).await {
            Ok(bytes) => bytes,
            Err(_) => {
                state.stats = state.stats.record_miss();
                return None;
            }
        };

        let image = match DecodedImage::from_bytes(&bytes) {
            Ok(image) => image,
            Err(_) => {
                warn!(%fingerprint, "cached blob is undecodable, removing");
                self.delete_entry_locked(&mut state, fingerprint.as_str()).await;
                if let Err(err) = self.persist_locked(&state).await {
                    warn!("failed to persist metadata after purge: {err:#}");
                }
                state.stats = state.stats.record_miss();
                return None;
            }
        };

        let now = epoch_seconds();
        // A decodable blob missing from the index (corrupt-metadata
        // recovery) is re-indexed in full, so expiry and eviction govern
        // it again; its expiry clock restarts at this read.
        if !state.created.contains_key(fingerprint.as_str()) {
            debug!(%fingerprint, "re-indexing orphaned blob");
            state.created.insert(fingerprint.to_string(), now);
        }
        state.accessed.insert(fingerprint.to_string(), now);
        if let Err(err) = self.persist_locked(&state).await {
            warn!("failed to persist access time: {err:#}");
        }
        state.stats = state.stats.record_hit();
        Some(image)
    }

    /// Store an image, re-encoded as JPEG at the configured quality.
    ///
    /// Alpha is flattened during encoding. Both timestamps are stamped to
    /// now, so overwriting an entry restarts its expiry clock; callers
    /// who want the original creation time preserved must not re-put.
    pub async fn put(&self, fingerprint: &Fingerprint, image: &DecodedImage) -> Result<()> {
        let encoded = image
            .encode_jpeg(self.config.quality)
            .context("failed to encode image for disk storage")?;

        let mut state = self.state.lock().await;
        self.write_atomic(&self.blob_path(fingerprint.as_str()), &encoded)
            .await
            .with_context(|| format!("failed to store blob for {fingerprint}"))?;

        let now = epoch_seconds();
        state.created.insert(fingerprint.to_string(), now);
        state.accessed.insert(fingerprint.to_string(), now);

        let mut housekeeping = HousekeepingStats::default();
        self.evict_over_budget_locked(&mut state, &mut housekeeping).await;
        self.persist_locked(&state).await?;

        debug!(%fingerprint, bytes = encoded.len(), "stored image on disk");
        Ok(())
    }

    pub async fn remove(&self, fingerprint: &Fingerprint) -> Result<()> {
        let mut state = self.state.lock().await;
        self.delete_entry_locked(&mut state, fingerprint.as_str()).await;
        self.persist_locked(&state).await
    }

    /// Drop the whole store: the subtree is removed and recreated empty.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        fs::remove_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to remove {}", self.dir.display()))?;
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to recreate {}", self.dir.display()))?;
        state.created.clear();
        state.accessed.clear();
        self.persist_locked(&state).await?;
        info!(dir = %self.dir.display(), "disk cache cleared");
        Ok(())
    }

    /// Purge every entry older than `max_age`; no-op when expiry is
    /// disabled. Returns the number of entries removed.
    pub async fn remove_expired(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut housekeeping = HousekeepingStats::default();
        self.sweep_expired_locked(&mut state, &mut housekeeping).await;
        if housekeeping.removed_by_age > 0 {
            self.persist_locked(&state).await?;
            info!(
                removed = housekeeping.removed_by_age,
                bytes_freed = housekeeping.bytes_freed,
                "removed expired disk cache entries"
            );
        }
        Ok(housekeeping.removed_by_age)
    }

    /// Run a full maintenance pass: expiry first, then size eviction.
    ///
    /// Runs once in the background when the store opens; hosts with a
    /// job scheduler can call it periodically as well.
    pub async fn housekeep(&self) -> Result<HousekeepingStats> {
        let mut state = self.state.lock().await;
        let mut housekeeping = HousekeepingStats::default();
        self.sweep_expired_locked(&mut state, &mut housekeeping).await;
        self.evict_over_budget_locked(&mut state, &mut housekeeping).await;
        self.persist_locked(&state).await?;
        info!(
            removed_by_age = housekeeping.removed_by_age,
            removed_by_size = housekeeping.removed_by_size,
            bytes_freed = housekeeping.bytes_freed,
            uptime = ?state.stats.uptime(),
            "disk cache housekeeping complete"
        );
        Ok(housekeeping)
    }

    /// Total size of stored blobs in bytes, sidecars excluded.
    pub async fn byte_size(&self) -> i64 {
        let _state = self.state.lock().await;
        self.measure_blob_bytes().await
    }

    pub async fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.state
            .lock()
            .await
            .created
            .contains_key(fingerprint.as_str())
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.stats
    }

    /// Timestamps and size for an indexed entry, for diagnostics.
    pub async fn entry_info(&self, fingerprint: &Fingerprint) -> Option<EntryInfo> {
        let state = self.state.lock().await;
        if !state.created.contains_key(fingerprint.as_str()) {
            return None;
        }
        let created_at = state
            .created
            .get(fingerprint.as_str())
            .and_then(|&secs| timestamp_from_epoch(secs));
        let last_access_at = state
            .accessed
            .get(fingerprint.as_str())
            .and_then(|&secs| timestamp_from_epoch(secs));
        let byte_size = self.blob_size(fingerprint.as_str()).await;
        Some(EntryInfo {
            fingerprint: fingerprint.clone(),
            byte_size,
            created_at,
            last_access_at,
        })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{BLOB_EXTENSION}"))
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("failed to move {} into place", tmp.display()))?;
        Ok(())
    }

    async fn persist_locked(&self, state: &DiskState) -> Result<()> {
        let accessed =
            serde_json::to_vec(&state.accessed).context("failed to serialize access times")?;
        let created =
            serde_json::to_vec(&state.created).context("failed to serialize creation times")?;
        self.write_atomic(&self.dir.join(ACCESS_TIMES_FILE), &accessed).await?;
        self.write_atomic(&self.dir.join(CREATION_TIMES_FILE), &created).await?;
        Ok(())
    }

    async fn delete_entry_locked(&self, state: &mut DiskState, key: &str) {
        if let Err(err) = fs::remove_file(self.blob_path(key)).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(key, "failed to remove cached blob: {err}");
            }
        }
        state.created.remove(key);
        state.accessed.remove(key);
    }

    async fn sweep_expired_locked(&self, state: &mut DiskState, out: &mut HousekeepingStats) {
        let Some(max_age) = self.config.max_age else {
            return;
        };
        let now = epoch_seconds();
        let expired: Vec<String> = state
            .created
            .iter()
            .filter(|(_, &created)| now - created > max_age.as_secs_f64())
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            out.bytes_freed += self.blob_size(&key).await;
            self.delete_entry_locked(state, &key).await;
            out.removed_by_age += 1;
        }
    }

    async fn evict_over_budget_locked(&self, state: &mut DiskState, out: &mut HousekeepingStats) {
        let mut total = self.measure_blob_bytes().await;
        if total <= self.config.max_bytes as i64 {
            return;
        }

        // Oldest access first; equal timestamps fall back to key order so
        // eviction stays deterministic.
        let mut candidates: Vec<(f64, String)> = state
            .accessed
            .iter()
            .map(|(key, &at)| (at, key.clone()))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for (_, key) in candidates {
            if total <= self.config.max_bytes as i64 {
                break;
            }
            let size = self.blob_size(&key).await;
            self.delete_entry_locked(state, &key).await;
            total -= size as i64;
            out.removed_by_size += 1;
            out.bytes_freed += size;
            debug!(key = %key, size, "evicted disk entry over size budget");
        }
    }

    async fn blob_size(&self, key: &str) -> u64 {
        fs::metadata(self.blob_path(key))
            .await
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    async fn measure_blob_bytes(&self) -> i64 {
        let mut total = 0i64;
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %self.dir.display(), "failed to read cache directory: {err}");
                return 0;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_blob = entry
                .path()
                .extension()
                .map(|ext| ext == BLOB_EXTENSION)
                .unwrap_or(false);
            if !is_blob {
                continue;
            }
            if let Ok(meta) = entry.metadata().await {
                total += meta.len() as i64;
            }
        }
        total
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn timestamp_from_epoch(seconds: f64) -> Option<DateTime<Utc>> {
    let whole = seconds.trunc() as i64;
    let nanos = (seconds.fract() * 1_000_000_000.0) as u32;
    DateTime::from_timestamp(whole, nanos)
}

async fn load_time_map(path: &Path) -> HashMap<String, f64> {
    match try_load_time_map(path).await {
        Ok(map) => map,
        Err(err) => {
            warn!(path = %path.display(), "metadata sidecar is corrupt, starting empty: {err}");
            HashMap::new()
        }
    }
}

async fn try_load_time_map(path: &Path) -> Result<HashMap<String, f64>, ImageError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(_) => return Ok(HashMap::new()),
    };
    serde_json::from_slice(&bytes).map_err(ImageError::decoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_image() -> DecodedImage {
        DecodedImage::from_dynamic(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            32,
            32,
            Rgb([12, 160, 220]),
        )))
    }

    fn config_in(dir: &TempDir) -> DiskCacheConfig {
        DiskCacheConfig {
            root: dir.path().to_path_buf(),
            directory: "ImageCache".to_string(),
            ..DiskCacheConfig::default()
        }
    }

    fn fp(name: &str) -> Fingerprint {
        Fingerprint::for_url(name)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(config_in(&dir)).await.unwrap();
        let image = sample_image();

        cache.put(&fp("a"), &image).await.unwrap();
        let found = cache.get(&fp("a")).await.expect("entry present");
        assert_eq!(found.width(), image.width());
        assert_eq!(found.height(), image.height());

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn remove_and_clear_forget_entries() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(config_in(&dir)).await.unwrap();
        cache.put(&fp("a"), &sample_image()).await.unwrap();
        cache.put(&fp("b"), &sample_image()).await.unwrap();

        cache.remove(&fp("a")).await.unwrap();
        assert!(cache.get(&fp("a")).await.is_none());
        assert!(cache.get(&fp("b")).await.is_some());

        cache.clear().await.unwrap();
        assert!(cache.get(&fp("b")).await.is_none());
        assert_eq!(cache.byte_size().await, 0);
    }

    #[tokio::test]
    async fn byte_size_counts_blobs_only() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(config_in(&dir)).await.unwrap();
        let image = sample_image();
        let blob_len = image.encode_jpeg(0.8).unwrap().len() as i64;

        cache.put(&fp("a"), &image).await.unwrap();
        // Sidecars exist next to the blob but are excluded from the sum.
        assert_eq!(cache.byte_size().await, blob_len);
    }

    #[tokio::test]
    async fn expired_entries_vanish_with_their_metadata() {
        let dir = TempDir::new().unwrap();
        let config = DiskCacheConfig {
            max_age: Some(Duration::from_millis(150)),
            ..config_in(&dir)
        };
        let cache = DiskCache::open(config).await.unwrap();
        cache.put(&fp("a"), &sample_image()).await.unwrap();
        assert!(cache.get(&fp("a")).await.is_some());

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(cache.get(&fp("a")).await.is_none());
        assert!(!cache.contains(&fp("a")).await);
        assert_eq!(cache.byte_size().await, 0);
    }

    #[tokio::test]
    async fn remove_expired_sweeps_in_bulk() {
        let dir = TempDir::new().unwrap();
        let config = DiskCacheConfig {
            max_age: Some(Duration::from_millis(100)),
            ..config_in(&dir)
        };
        let cache = DiskCache::open(config).await.unwrap();
        cache.put(&fp("a"), &sample_image()).await.unwrap();
        cache.put(&fp("b"), &sample_image()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.remove_expired().await.unwrap(), 2);
        assert_eq!(cache.byte_size().await, 0);
    }

    #[tokio::test]
    async fn eviction_is_lru_by_access_time() {
        let dir = TempDir::new().unwrap();
        let image = sample_image();
        let blob_len = image.encode_jpeg(0.8).unwrap().len() as u64;
        let config = DiskCacheConfig {
            max_bytes: blob_len * 2 + blob_len / 2,
            max_age: None,
            ..config_in(&dir)
        };
        let cache = DiskCache::open(config).await.unwrap();

        for name in ["a", "b", "c"] {
            cache.put(&fp(name), &image).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // Third put pushed the total over budget; "a" had the oldest access.
        assert!(!cache.contains(&fp("a")).await);
        assert!(cache.contains(&fp("b")).await);
        assert!(cache.contains(&fp("c")).await);

        // Touch "b" so "c" becomes the next eviction candidate.
        cache.get(&fp("b")).await.expect("hit");
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.put(&fp("d"), &image).await.unwrap();

        assert!(cache.contains(&fp("b")).await);
        assert!(!cache.contains(&fp("c")).await);
        assert!(cache.contains(&fp("d")).await);
    }

    #[tokio::test]
    async fn size_bound_holds_after_every_put() {
        let dir = TempDir::new().unwrap();
        let image = sample_image();
        let blob_len = image.encode_jpeg(0.8).unwrap().len() as u64;
        let config = DiskCacheConfig {
            max_bytes: blob_len * 3,
            max_age: None,
            ..config_in(&dir)
        };
        let cache = DiskCache::open(config).await.unwrap();

        for index in 0..6 {
            cache.put(&fp(&format!("entry-{index}")), &image).await.unwrap();
            assert!(cache.byte_size().await <= (blob_len * 3) as i64);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn reopens_with_prior_entries_accessible() {
        let dir = TempDir::new().unwrap();
        {
            let cache = DiskCache::open(config_in(&dir)).await.unwrap();
            cache.put(&fp("persisted"), &sample_image()).await.unwrap();
        }

        let reopened = DiskCache::open(config_in(&dir)).await.unwrap();
        assert!(reopened.contains(&fp("persisted")).await);
        assert!(reopened.get(&fp("persisted")).await.is_some());
    }

    #[tokio::test]
    async fn corrupt_metadata_degrades_to_empty_index() {
        let dir = TempDir::new().unwrap();
        {
            let cache = DiskCache::open(config_in(&dir)).await.unwrap();
            cache.put(&fp("orphan"), &sample_image()).await.unwrap();
        }
        let store_dir = dir.path().join("ImageCache");
        std::fs::write(store_dir.join(ACCESS_TIMES_FILE), b"{not json").unwrap();
        std::fs::write(store_dir.join(CREATION_TIMES_FILE), b"{not json").unwrap();

        let cache = DiskCache::open(config_in(&dir)).await.unwrap();
        assert!(!cache.contains(&fp("orphan")).await);
        assert_eq!(cache.remove_expired().await.unwrap(), 0);
        // The blob survives on disk, orphaned from the index.
        assert!(cache.byte_size().await > 0);

        // Reading the orphan re-indexes it in full: both timestamps are
        // restored, so expiry and eviction govern it again.
        assert!(cache.get(&fp("orphan")).await.is_some());
        assert!(cache.contains(&fp("orphan")).await);
        let info = cache.entry_info(&fp("orphan")).await.expect("re-indexed entry");
        assert!(info.created_at.is_some());
        assert!(info.last_access_at.is_some());
    }

    #[tokio::test]
    async fn reindexed_orphan_expires_like_any_other_entry() {
        let dir = TempDir::new().unwrap();
        let config = DiskCacheConfig {
            max_age: Some(Duration::from_millis(150)),
            ..config_in(&dir)
        };
        {
            let cache = DiskCache::open(config.clone()).await.unwrap();
            cache.put(&fp("orphan"), &sample_image()).await.unwrap();
        }
        let store_dir = dir.path().join("ImageCache");
        std::fs::write(store_dir.join(CREATION_TIMES_FILE), b"{not json").unwrap();

        let cache = DiskCache::open(config).await.unwrap();
        assert!(cache.get(&fp("orphan")).await.is_some());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(cache.get(&fp("orphan")).await.is_none());
        assert_eq!(cache.byte_size().await, 0);
    }

    #[tokio::test]
    async fn housekeep_reports_age_and_size_removals() {
        let dir = TempDir::new().unwrap();
        let config = DiskCacheConfig {
            max_age: Some(Duration::from_millis(100)),
            ..config_in(&dir)
        };
        let cache = DiskCache::open(config).await.unwrap();
        cache.put(&fp("a"), &sample_image()).await.unwrap();
        cache.put(&fp("b"), &sample_image()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let report = cache.housekeep().await.unwrap();
        assert_eq!(report.removed_by_age, 2);
        assert_eq!(report.removed_by_size, 0);
        assert!(report.bytes_freed > 0);
        assert_eq!(cache.byte_size().await, 0);
    }

    #[tokio::test]
    async fn undecodable_blob_is_a_miss_and_gets_deleted() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(config_in(&dir)).await.unwrap();
        cache.put(&fp("bad"), &sample_image()).await.unwrap();

        let blob = dir
            .path()
            .join("ImageCache")
            .join(format!("{}.img", fp("bad")));
        std::fs::write(&blob, b"corrupted beyond recognition").unwrap();

        assert!(cache.get(&fp("bad")).await.is_none());
        assert!(!blob.exists());
        assert!(!cache.contains(&fp("bad")).await);
    }

    #[tokio::test]
    async fn entry_info_reports_timestamps_and_size() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(config_in(&dir)).await.unwrap();
        let image = sample_image();
        cache.put(&fp("a"), &image).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.get(&fp("a")).await.expect("hit");

        let info = cache.entry_info(&fp("a")).await.expect("indexed entry");
        assert_eq!(info.byte_size, image.encode_jpeg(0.8).unwrap().len() as u64);
        let created = info.created_at.expect("creation timestamp");
        let accessed = info.last_access_at.expect("access timestamp");
        assert!(accessed >= created);

        assert!(cache.entry_info(&fp("never-stored")).await.is_none());
    }

    #[tokio::test]
    async fn missing_blob_is_a_plain_miss() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(config_in(&dir)).await.unwrap();
        assert!(cache.get(&fp("never-stored")).await.is_none());
        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }
}
