//! Configuration structs for the cache tiers and the downloader.
//!
//! Every struct derives serde so a host application can embed the engine
//! configuration in its own config file; durations accept either plain
//! seconds or human-readable strings ("7days", "500ms") through
//! [`duration_serde`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod duration_serde;

const MIB: u64 = 1024 * 1024;

/// Top-level configuration bundling every tunable of the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub memory: MemoryCacheConfig,
    pub disk: DiskCacheConfig,
    pub download: DownloadConfig,
}

/// Bounds for the in-memory image cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    /// Upper bound on the summed byte cost of cached pixel buffers.
    pub max_cost_bytes: usize,
    /// Upper bound on the number of cached images.
    pub max_entries: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_cost_bytes: (50 * MIB) as usize,
            max_entries: 100,
        }
    }
}

/// Location and bounds for the persistent disk cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskCacheConfig {
    /// Cache root the store's directory is created under.
    pub root: PathBuf,
    /// Subdirectory name owned exclusively by one store instance.
    pub directory: String,
    /// Upper bound on the summed size of stored image blobs.
    pub max_bytes: u64,
    /// Entries older than this (from creation) are purged; `None`
    /// disables expiry.
    #[serde(with = "duration_serde::option_duration")]
    pub max_age: Option<Duration>,
    /// JPEG quality in `[0.0, 1.0]` used when persisting images.
    pub quality: f32,
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./cache"),
            directory: "ImageCache".to_string(),
            max_bytes: 100 * MIB,
            max_age: Some(Duration::from_secs(7 * 24 * 60 * 60)),
            quality: 0.8,
        }
    }
}

/// Downloader behavior: retry policy, timeouts, headers, concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Retries after the first attempt; 3 means up to four attempts.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    #[serde(with = "duration_serde::duration")]
    pub retry_delay: Duration,
    /// Per-request timeout covering the full response body.
    #[serde(with = "duration_serde::duration")]
    pub timeout: Duration,
    /// Extra request headers, applied verbatim.
    pub headers: HashMap<String, String>,
    /// Maximum simultaneous downloads.
    pub max_concurrent: usize,
    /// User-Agent presented to remote servers.
    pub user_agent: String,
    /// Responses larger than this are rejected as invalid image data.
    pub max_body_bytes: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            headers: HashMap::new(),
            max_concurrent: 6,
            user_agent: concat!("pixfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: (10 * MIB) as usize,
        }
    }
}
