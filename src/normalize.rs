//! HEIC/HEIF pre-conversion.
//!
//! The pixel backend cannot decode HEIC, so a HEIC input is handed to a
//! [`HeicCodec`] and re-encoded as a JPEG at [`INTERMEDIATE_JPEG_QUALITY`].
//! The resulting [`InputFile`] keeps the original filename and is retagged
//! `image/jpeg`, so it goes through the encoder like any direct input.
//!
//! Multi-image containers yield several blobs; only the first is used.

use crate::convert::ConvertError;
use crate::imaging::heic::{HeicCodec, HeicError, INTERMEDIATE_JPEG_QUALITY};
use crate::types::InputFile;

/// MIME type of a normalized file.
pub const NORMALIZED_MIME: &str = "image/jpeg";

/// Re-encode a HEIC/HEIF input as a decodable JPEG.
///
/// Fails with [`ConvertError::CodecUnavailable`] when the codec is missing
/// (probed before any decode) and with [`ConvertError::DecodeFailed`] when
/// the container yields no usable image.
pub fn normalize(codec: &dyn HeicCodec, file: &InputFile) -> Result<InputFile, ConvertError> {
    let unavailable = || ConvertError::CodecUnavailable {
        name: file.name.clone(),
        codec: codec.name().to_string(),
    };
    let decode_failed = |reason: String| ConvertError::DecodeFailed {
        name: file.name.clone(),
        reason,
    };

    if !codec.is_available() {
        return Err(unavailable());
    }

    let blobs = match codec.to_jpeg(&file.bytes, INTERMEDIATE_JPEG_QUALITY) {
        Ok(blobs) => blobs,
        Err(HeicError::Unavailable) => return Err(unavailable()),
        Err(HeicError::Decode(reason)) => return Err(decode_failed(reason)),
    };
    if blobs.len() > 1 {
        tracing::debug!(file = %file.name, images = blobs.len(), "using first image of container");
    }

    let jpeg = blobs
        .into_iter()
        .next()
        .filter(|blob| !blob.is_empty())
        .ok_or_else(|| decode_failed("container holds no image".to_string()))?;

    Ok(InputFile::new(file.name.clone(), NORMALIZED_MIME, jpeg))
}
