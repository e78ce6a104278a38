//! Network side of the engine: transport seam, request deduplication,
//! concurrency limiting, prefetch tracking, and the retrying downloader.

pub mod dedup;
pub mod downloader;
pub mod limiter;
pub mod prefetch;
pub mod transport;

pub use dedup::Deduplicator;
pub use downloader::{Downloader, ProgressSink};
pub use limiter::ConcurrencyLimiter;
pub use prefetch::PrefetchRegistry;
pub use transport::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};
