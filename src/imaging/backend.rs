//! Pixel codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the conversion
//! stage needs from a pixel codec: decode bytes into a surface, resample a
//! surface to exact dimensions, and encode a surface as lossy WebP.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! recording `MockBackend` in this module.

use super::params::{Quality, ResizeParams};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of a decoded surface.
    pub fn of(surface: &DynamicImage) -> Self {
        Self::new(surface.width(), surface.height())
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\u{d7}{}", self.width, self.height)
    }
}

/// Trait for pixel codec backends.
///
/// Decoded surfaces are plain [`DynamicImage`]s so the conversion stage can
/// read natural dimensions without asking the backend again.
pub trait ImageBackend: Sync {
    /// Decode encoded image bytes (JPEG, PNG, GIF, BMP, AVIF) into a surface.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Resample a surface to exactly the requested dimensions.
    fn resize(
        &self,
        surface: &DynamicImage,
        params: &ResizeParams,
    ) -> Result<DynamicImage, BackendError>;

    /// Encode a surface as lossy WebP. An empty result means the encoder
    /// produced nothing.
    fn encode_webp(
        &self,
        surface: &DynamicImage,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
