//! Retrying, deduplicated, concurrency-bounded image downloader.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DownloadConfig;
use crate::download::dedup::Deduplicator;
use crate::download::limiter::ConcurrencyLimiter;
use crate::download::prefetch::PrefetchRegistry;
use crate::download::transport::{HttpTransport, ReqwestTransport, TransportRequest};
use crate::errors::{ImageError, ImageResult};
use crate::fingerprint::Fingerprint;
use crate::image_data::DecodedImage;

/// Callback receiving download progress as a fraction in `[0.0, 1.0]`.
///
/// Values are monotonic non-decreasing and may skip; the final value need
/// not be exactly 1.0. The sink is never invoked after the load returns.
pub type ProgressSink = Arc<dyn Fn(f64) + Send + Sync>;

/// Downloads image bytes with retry, backoff, and progress streaming.
///
/// Each instance carries its own deduplicator, limiter, and prefetch
/// registry, so isolated instances are cheap to construct for tests;
/// [`Downloader::shared`] provides the process-wide default.
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn HttpTransport>,
    config: DownloadConfig,
    dedup: Deduplicator,
    limiter: ConcurrencyLimiter,
    prefetch: PrefetchRegistry,
}

impl Downloader {
    pub fn new(config: DownloadConfig) -> ImageResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.user_agent)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Construct over a custom transport (used by tests and embedders).
    pub fn with_transport(config: DownloadConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let limiter = ConcurrencyLimiter::new(config.max_concurrent);
        Self {
            transport,
            config,
            dedup: Deduplicator::new(),
            limiter,
            prefetch: PrefetchRegistry::new(),
        }
    }

    /// Process-wide default instance with default configuration.
    pub fn shared() -> &'static Downloader {
        static SHARED: OnceLock<Downloader> = OnceLock::new();
        SHARED.get_or_init(|| {
            Downloader::new(DownloadConfig::default()).expect("failed to build default HTTP client")
        })
    }

    /// Fetch and decode the image at `url`.
    ///
    /// Concurrent calls for the same URL collapse onto one transfer; the
    /// transfer itself holds a limiter permit, and decoding runs on a
    /// blocking worker so the calling task is never stalled on pixels.
    pub async fn load_image(
        &self,
        url: &str,
        sink: Option<ProgressSink>,
    ) -> ImageResult<DecodedImage> {
        let downloader = self.clone();
        let owned_url = url.to_string();
        let bytes = self
            .dedup
            .run(url, move || async move {
                downloader
                    .limiter
                    .with_limit(|| downloader.download_bytes(&owned_url, sink.as_ref()))
                    .await
            })
            .await?;
        decode_in_background(bytes).await
    }

    /// Spawn a detached background job tracked for [`cancel_prefetch`].
    ///
    /// The job body is supplied by the caller (the cache manager routes
    /// it through its full load pipeline); its errors are its own to
    /// swallow. Cancelling aborts only this job: work it joined through
    /// the deduplicator survives as long as a foreground caller holds it.
    ///
    /// [`cancel_prefetch`]: Downloader::cancel_prefetch
    pub fn spawn_prefetch<Fut>(&self, url: &str, job: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let fingerprint = Fingerprint::for_url(url);
        let registry = self.prefetch.clone();
        let finished_key = fingerprint.clone();

        // The job only starts once it is registered, so its completion
        // cleanup cannot race the registration itself.
        let (registered_tx, registered_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = registered_rx.await;
            job.await;
            registry.remove(&finished_key);
        });
        self.prefetch.add(fingerprint, handle.abort_handle());
        let _ = registered_tx.send(());
    }

    /// Cancel the tracked prefetch jobs for the given URLs.
    pub fn cancel_prefetch<S: AsRef<str>>(&self, urls: &[S]) {
        for url in urls {
            self.prefetch.cancel(&Fingerprint::for_url(url.as_ref()));
        }
    }

    /// Cancel the in-flight download for a URL; every joiner observes
    /// [`ImageError::Cancelled`].
    pub fn cancel(&self, url: &str) {
        self.dedup.cancel(url);
    }

    pub fn cancel_all(&self) {
        self.dedup.cancel_all();
    }

    pub fn in_flight_downloads(&self) -> usize {
        self.dedup.in_flight_count()
    }

    pub fn active_prefetch_count(&self) -> usize {
        self.prefetch.len()
    }

    /// Download raw bytes with the configured retry policy.
    ///
    /// Transient failures (network, 5xx, 408, 429) are consumed silently
    /// up to `max_retries`, sleeping `retry_delay * 2^attempt` between
    /// attempts; only the last error surfaces. Client errors outside
    /// 408/429 are final and never consume retry budget.
    async fn download_bytes(
        &self,
        url: &str,
        sink: Option<&ProgressSink>,
    ) -> ImageResult<Bytes> {
        let mut reported = 0.0f64;
        let mut attempt: u32 = 0;
        loop {
            match self.attempt_download(url, sink, &mut reported).await {
                Ok(bytes) => {
                    debug!(url, bytes = bytes.len(), attempt, "download complete");
                    return Ok(bytes);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_delay * 2u32.saturating_pow(attempt);
                    warn!(url, attempt, "download failed ({err}), retrying in {delay:?}");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(url, attempt, "download failed permanently: {err}");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt_download(
        &self,
        url: &str,
        sink: Option<&ProgressSink>,
        reported: &mut f64,
    ) -> ImageResult<Bytes> {
        let response = self
            .transport
            .fetch(TransportRequest {
                url: url.to_string(),
                headers: self.config.headers.clone(),
                timeout: self.config.timeout,
            })
            .await?;

        if !(200..300).contains(&response.status) {
            return Err(ImageError::InvalidResponse(i32::from(response.status)));
        }

        let expected_total = response.content_length.filter(|&total| total > 0);
        let mut body = response.body;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if buffer.len() + chunk.len() > self.config.max_body_bytes {
                return Err(ImageError::InvalidImageData);
            }
            buffer.extend_from_slice(&chunk);

            if let (Some(sink), Some(total)) = (sink, expected_total) {
                let fraction = (buffer.len() as f64 / total as f64).clamp(0.0, 1.0);
                // The gate keeps emissions monotonic even across retries,
                // where the buffer restarts from zero.
                if fraction >= *reported {
                    *reported = fraction;
                    sink(fraction);
                }
            }
        }

        Ok(buffer.freeze())
    }
}

/// Decode image bytes off the async scheduler threads.
pub(crate) async fn decode_in_background(bytes: Bytes) -> ImageResult<DecodedImage> {
    tokio::task::spawn_blocking(move || DecodedImage::from_bytes(&bytes))
        .await
        .map_err(|err| ImageError::unknown(format!("decode worker failed: {err}")))?
}
