//! HEIC/HEIF codec collaborator.
//!
//! HEIC is not decodable by the main pixel backend, so HEIC inputs are first
//! re-encoded as high-quality JPEG by a [`HeicCodec`]. The codec may be
//! missing entirely (the `heic` cargo feature is off, or the system libheif
//! is absent), which callers discover through [`HeicCodec::is_available`].
//!
//! | Implementation | When |
//! |---|---|
//! | [`LibHeifCodec`] | `heic` feature on: `libheif-rs` decode + `image` JPEG encode |
//! | [`UnavailableHeicCodec`] | `heic` feature off |

use thiserror::Error;

/// JPEG quality used for the intermediate image, in percent.
pub const INTERMEDIATE_JPEG_QUALITY: u8 = 95;

#[derive(Error, Debug)]
pub enum HeicError {
    #[error("HEIC codec is not available")]
    Unavailable,
    #[error("HEIC decode failed: {0}")]
    Decode(String),
}

/// Decodes HEIC/HEIF containers and re-encodes their images as JPEG.
pub trait HeicCodec: Sync {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Whether the codec can be used in this process.
    fn is_available(&self) -> bool;

    /// Re-encode the images of a container as JPEG, one blob per image, in
    /// container order.
    fn to_jpeg(&self, bytes: &[u8], quality: u8) -> Result<Vec<Vec<u8>>, HeicError>;
}

/// Stand-in used when no HEIC support is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableHeicCodec;

impl HeicCodec for UnavailableHeicCodec {
    fn name(&self) -> &'static str {
        "heic"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn to_jpeg(&self, _bytes: &[u8], _quality: u8) -> Result<Vec<Vec<u8>>, HeicError> {
        Err(HeicError::Unavailable)
    }
}

/// HEIC codec backed by the system libheif.
///
/// Only the primary image of a container is decoded, so the returned
/// sequence always has one entry.
#[cfg(feature = "heic")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LibHeifCodec;

#[cfg(feature = "heic")]
impl HeicCodec for LibHeifCodec {
    fn name(&self) -> &'static str {
        "libheif"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn to_jpeg(&self, bytes: &[u8], quality: u8) -> Result<Vec<Vec<u8>>, HeicError> {
        use image::codecs::jpeg::JpegEncoder;
        use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

        let decode_err = |e: libheif_rs::HeifError| HeicError::Decode(e.to_string());

        let lib_heif = LibHeif::new();
        let ctx = HeifContext::read_from_bytes(bytes).map_err(decode_err)?;
        let handle = ctx.primary_image_handle().map_err(decode_err)?;
        let (width, height) = (handle.width(), handle.height());

        let decoded = lib_heif
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(decode_err)?;
        let planes = decoded.planes();
        let interleaved = planes
            .interleaved
            .ok_or_else(|| HeicError::Decode("no interleaved RGB plane".to_string()))?;

        // Rows are padded to `stride`; copy only the visible pixels.
        let row_len = width as usize * 3;
        let mut rgb = Vec::with_capacity(row_len * height as usize);
        for row in interleaved.data.chunks(interleaved.stride).take(height as usize) {
            let visible = row
                .get(..row_len)
                .ok_or_else(|| HeicError::Decode("truncated RGB plane".to_string()))?;
            rgb.extend_from_slice(visible);
        }
        let image = image::RgbImage::from_raw(width, height, rgb)
            .ok_or_else(|| HeicError::Decode("RGB plane does not match dimensions".to_string()))?;

        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, quality))
            .map_err(|e| HeicError::Decode(format!("JPEG re-encode failed: {e}")))?;
        Ok(vec![jpeg])
    }
}

/// The HEIC codec compiled into this build.
pub fn default_codec() -> Box<dyn HeicCodec> {
    #[cfg(feature = "heic")]
    {
        Box::new(LibHeifCodec)
    }
    #[cfg(not(feature = "heic"))]
    {
        Box::new(UnavailableHeicCodec)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted HEIC codec. Records the quality of every call.
    pub struct MockHeicCodec {
        pub available: bool,
        pub result: Mutex<Option<Result<Vec<Vec<u8>>, HeicError>>>,
        pub calls: Mutex<Vec<u8>>,
    }

    impl MockHeicCodec {
        pub fn returning(blobs: Vec<Vec<u8>>) -> Self {
            Self {
                available: true,
                result: Mutex::new(Some(Ok(blobs))),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(reason: &str) -> Self {
            Self {
                available: true,
                result: Mutex::new(Some(Err(HeicError::Decode(reason.to_string())))),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn unavailable() -> Self {
            Self {
                available: false,
                result: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl HeicCodec for MockHeicCodec {
        fn name(&self) -> &'static str {
            "mock-heic"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn to_jpeg(&self, _bytes: &[u8], quality: u8) -> Result<Vec<Vec<u8>>, HeicError> {
            self.calls.lock().unwrap().push(quality);
            self.result
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(HeicError::Unavailable))
        }
    }

    #[test]
    fn unavailable_codec_reports_itself() {
        let codec = UnavailableHeicCodec;
        assert!(!codec.is_available());
        assert!(matches!(
            codec.to_jpeg(b"x", INTERMEDIATE_JPEG_QUALITY),
            Err(HeicError::Unavailable)
        ));
    }

    #[cfg(not(feature = "heic"))]
    #[test]
    fn default_codec_without_feature_is_unavailable() {
        assert!(!default_codec().is_available());
    }

    #[cfg(feature = "heic")]
    #[test]
    fn libheif_rejects_non_heic_bytes() {
        let codec = LibHeifCodec;
        assert!(matches!(
            codec.to_jpeg(b"not a heic file", INTERMEDIATE_JPEG_QUALITY),
            Err(HeicError::Decode(_))
        ));
    }
}
