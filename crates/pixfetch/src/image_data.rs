//! Decoded image wrapper shared between the cache tiers.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::errors::{ImageError, ImageResult};

/// A decoded image with shared, immutable pixel storage.
///
/// Cloning is cheap (the pixel buffer is behind an `Arc`), so a cache
/// eviction never invalidates an image a caller is still holding.
#[derive(Clone)]
pub struct DecodedImage {
    pixels: Arc<DynamicImage>,
}

impl DecodedImage {
    /// Decode an image from raw bytes in any supported container format.
    ///
    /// Empty or undecodable input maps to [`ImageError::InvalidImageData`].
    pub fn from_bytes(data: &[u8]) -> ImageResult<Self> {
        if data.is_empty() {
            return Err(ImageError::InvalidImageData);
        }
        let pixels = image::load_from_memory(data).map_err(|_| ImageError::InvalidImageData)?;
        Ok(Self { pixels: Arc::new(pixels) })
    }

    pub fn from_dynamic(pixels: DynamicImage) -> Self {
        Self { pixels: Arc::new(pixels) }
    }

    /// Accounted memory footprint of the pixel buffer in bytes.
    pub fn byte_cost(&self) -> usize {
        self.pixels.as_bytes().len()
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Re-encode as JPEG at the given quality in `[0.0, 1.0]`.
    ///
    /// JPEG carries no alpha channel, so the image is flattened to RGB
    /// first; transparency present in the source is lost.
    pub fn encode_jpeg(&self, quality: f32) -> ImageResult<Vec<u8>> {
        let quality = ((quality.clamp(0.0, 1.0) * 100.0).round() as u8).max(1);
        let flattened = self.pixels.to_rgb8();
        let mut encoded = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut encoded), quality);
        encoder
            .encode_image(&flattened)
            .map_err(|err| ImageError::unknown(format!("jpeg encoding failed: {err}")))?;
        Ok(encoded)
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("byte_cost", &self.byte_cost())
            .finish()
    }
}
