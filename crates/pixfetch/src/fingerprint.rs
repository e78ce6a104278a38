//! Content-addressed cache keys derived from source URLs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 32-character lowercase hex digest of a URL.
///
/// Doubles as the cache key and the on-disk file stem for the entry. The
/// digest is computed over the URL string exactly as given; callers are
/// expected to pass the absolute form they resolve against, since two
/// spellings of the same resource hash to different entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digest a URL into its cache fingerprint.
    pub fn for_url(url: &str) -> Self {
        Self(format!("{:x}", md5::compute(url.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
