//! Error taxonomy for image loading and caching.
//!
//! Every variant carries a stable, human-readable description suitable
//! for direct display; callers are not required to branch on subcodes.
//! The type is `Clone` because a single failure is fanned out to every
//! caller joined on the same in-flight download, so causes are captured
//! as strings rather than source errors.

use thiserror::Error;

/// Failures observable by callers of the load/download pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// Bytes were present but empty or undecodable as an image.
    #[error("image data is empty or cannot be decoded")]
    InvalidImageData,

    /// HTTP response outside the 2xx range; `-1` when no parseable
    /// response was received at all.
    #[error("{}", response_message(.0))]
    InvalidResponse(i32),

    /// Transport-level failure (connection reset, DNS, TLS, timeout).
    #[error("network failure: {0}")]
    Network(String),

    /// Side-metadata could not be parsed. Never raised for image bytes
    /// themselves; see [`ImageError::InvalidImageData`].
    #[error("metadata decoding failed: {0}")]
    Decoding(String),

    /// The operation was cancelled by the caller or by propagation.
    #[error("the operation was cancelled")]
    Cancelled,

    /// Catch-all wrapping an unexpected cause.
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl ImageError {
    pub fn network(cause: impl std::fmt::Display) -> Self {
        Self::Network(cause.to_string())
    }

    pub fn decoding(cause: impl std::fmt::Display) -> Self {
        Self::Decoding(cause.to_string())
    }

    pub fn unknown(cause: impl std::fmt::Display) -> Self {
        Self::Unknown(cause.to_string())
    }

    /// Whether the download pipeline may retry after this failure.
    ///
    /// Client errors are final except for 408 (request timeout) and 429
    /// (rate limited); everything transport-shaped is worth another
    /// attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidResponse(status) => {
                matches!(status, 408 | 429) || !(400..500).contains(status)
            }
            Self::Network(_) | Self::Unknown(_) => true,
            Self::InvalidImageData | Self::Decoding(_) | Self::Cancelled => false,
        }
    }
}

fn response_message(status: &i32) -> String {
    match *status {
        -1 => "the server response was missing or malformed".to_string(),
        401 | 403 => format!("access to the requested resource was denied (HTTP {status})"),
        404 => "the requested resource was not found".to_string(),
        408 => "the server timed out waiting for the request".to_string(),
        429 => "too many requests were sent to the server".to_string(),
        500..=599 => format!("the server failed to process the request (HTTP {status})"),
        _ => format!("the server rejected the request (HTTP {status})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_final_except_timeout_and_rate_limit() {
        assert!(!ImageError::InvalidResponse(400).is_retryable());
        assert!(!ImageError::InvalidResponse(404).is_retryable());
        assert!(!ImageError::InvalidResponse(451).is_retryable());
        assert!(ImageError::InvalidResponse(408).is_retryable());
        assert!(ImageError::InvalidResponse(429).is_retryable());
    }

    #[test]
    fn server_and_transport_errors_retry() {
        assert!(ImageError::InvalidResponse(500).is_retryable());
        assert!(ImageError::InvalidResponse(503).is_retryable());
        assert!(ImageError::InvalidResponse(-1).is_retryable());
        assert!(ImageError::network("connection reset").is_retryable());
    }

    #[test]
    fn terminal_kinds_never_retry() {
        assert!(!ImageError::InvalidImageData.is_retryable());
        assert!(!ImageError::Cancelled.is_retryable());
        assert!(!ImageError::decoding("bad json").is_retryable());
    }

    #[test]
    fn descriptions_are_user_presentable() {
        assert_eq!(
            ImageError::InvalidResponse(404).to_string(),
            "the requested resource was not found"
        );
        assert_eq!(
            ImageError::InvalidResponse(-1).to_string(),
            "the server response was missing or malformed"
        );
        assert!(ImageError::InvalidResponse(502).to_string().contains("502"));
    }
}
