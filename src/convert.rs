//! Single-image conversion to WebP.
//!
//! One call turns one (already normalized) [`InputFile`] into a
//! [`ConversionRecord`]:
//!
//! ```text
//! bytes ──decode──▶ surface (natural W×H)
//!                     │ plan_dimensions(W, H, max_dimension)
//!                     ▼
//!                   surface (planned W'×H') ──encode_webp(quality)──▶ WebP bytes
//! ```
//!
//! Decode, resample and encode are the three points where the backend does
//! work; each has a single failure channel that maps onto [`ConvertError`].
//!
//! Quality and max dimension arrive in [`EncodeOptions`] by value. The batch
//! driver reads the shared quality setting once per file and hands the copy
//! in here, so later updates never leak into a conversion already running.

use crate::imaging::{Dimensions, ImageBackend, Quality, ResizeParams, plan_dimensions};
use crate::results::{ConversionRecord, RecordId};
use crate::types::InputFile;
use thiserror::Error;

/// Largest edge allowed when nothing else is configured.
pub const DEFAULT_MAX_DIMENSION: u32 = 2000;

/// The four per-file failure kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("{name}: unsupported format ({})", display_mime(.mime))]
    UnsupportedFormat { name: String, mime: String },
    #[error("{name}: the {codec} codec is not available")]
    CodecUnavailable { name: String, codec: String },
    #[error("{name}: could not decode ({reason})")]
    DecodeFailed { name: String, reason: String },
    #[error("{name}: could not encode WebP ({reason})")]
    EncodeFailed { name: String, reason: String },
}

/// A declared MIME type for display; `"no type"` when none was declared.
pub fn display_mime(mime: &str) -> &str {
    if mime.is_empty() { "no type" } else { mime }
}

/// Which of the four failures happened, without the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    CodecUnavailable,
    DecodeFailed,
    EncodeFailed,
}

impl ConvertError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConvertError::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            ConvertError::CodecUnavailable { .. } => FailureKind::CodecUnavailable,
            ConvertError::DecodeFailed { .. } => FailureKind::DecodeFailed,
            ConvertError::EncodeFailed { .. } => FailureKind::EncodeFailed,
        }
    }

    /// Name of the file the failure belongs to.
    pub fn file_name(&self) -> &str {
        match self {
            ConvertError::UnsupportedFormat { name, .. }
            | ConvertError::CodecUnavailable { name, .. }
            | ConvertError::DecodeFailed { name, .. }
            | ConvertError::EncodeFailed { name, .. } => name,
        }
    }
}

/// Settings for one conversion, captured when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub quality: Quality,
    pub max_dimension: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Convert one decodable file to WebP.
///
/// `file.size()` is recorded as the original size. For HEIC inputs `file` is
/// the intermediate JPEG, so savings are measured against that JPEG.
pub fn encode(
    backend: &impl ImageBackend,
    file: &InputFile,
    options: EncodeOptions,
) -> Result<ConversionRecord, ConvertError> {
    let decode_failed = |reason: String| ConvertError::DecodeFailed {
        name: file.name.clone(),
        reason,
    };
    let encode_failed = |reason: String| ConvertError::EncodeFailed {
        name: file.name.clone(),
        reason,
    };

    let surface = backend
        .decode(&file.bytes)
        .map_err(|e| decode_failed(e.to_string()))?;
    let original = Dimensions::of(&surface);

    let (width, height) = plan_dimensions(original.width, original.height, options.max_dimension);
    tracing::debug!(
        file = %file.name,
        original = %original,
        planned = %Dimensions::new(width, height),
        "planned output dimensions"
    );

    let resized = backend
        .resize(&surface, &ResizeParams { width, height })
        .map_err(|e| encode_failed(e.to_string()))?;
    drop(surface);

    let webp = backend
        .encode_webp(&resized, options.quality)
        .map_err(|e| encode_failed(e.to_string()))?;
    if webp.is_empty() {
        return Err(encode_failed("encoder produced no output".to_string()));
    }
    tracing::debug!(file = %file.name, bytes = webp.len(), "encoded WebP");

    Ok(ConversionRecord::new(
        RecordId::next(),
        file.name.clone(),
        file.size(),
        original,
        webp,
        options.quality.percent(),
        Dimensions::new(width, height),
    ))
}
