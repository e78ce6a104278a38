//! Concurrent HTTP image fetcher with a two-tier cache.
//!
//! The crate layers a volatile in-memory LRU over a persistent on-disk
//! store and fronts both with a downloader that collapses duplicate
//! in-flight requests, bounds concurrency, retries transient failures
//! with exponential backoff, and streams download progress to callers.
//!
//! The usual entry point is [`CacheManager::load`], which resolves a URL
//! through memory, disk, and finally the network, promoting and
//! write-through-caching along the way.

pub mod cache;
pub mod config;
pub mod download;
pub mod errors;
pub mod fingerprint;
pub mod image_data;
pub mod pressure;

pub use cache::{CacheManager, CacheStats, DiskCache, LoadOptions, MemoryCache};
pub use config::{DiskCacheConfig, DownloadConfig, EngineConfig, MemoryCacheConfig};
pub use download::{Downloader, ProgressSink};
pub use errors::{ImageError, ImageResult};
pub use fingerprint::Fingerprint;
pub use image_data::DecodedImage;
pub use pressure::{MemoryPressureNotifier, PressureSubscription};
