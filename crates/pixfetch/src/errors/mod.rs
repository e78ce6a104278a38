//! Error types surfaced at the crate boundary.

pub mod types;

pub use types::ImageError;

/// Convenience alias for fallible operations on the load/download path.
pub type ImageResult<T> = Result<T, ImageError>;
