//! Input format classification.
//!
//! Decides, from the declared MIME type and the filename alone, whether an
//! input can go straight to the pixel backend, needs HEIC pre-conversion, or
//! is rejected. No bytes are inspected.
//!
//! ```text
//! image/jpeg, image/png, image/gif, image/bmp, image/avif  → Direct
//! image/heic, image/heif                                  → NeedsHeicNormalization
//! "" or application/octet-stream + *.heic / *.heif        → NeedsHeicNormalization
//! anything else                                           → Unsupported
//! ```
//!
//! The extension fallback exists because HEIC files frequently arrive with no
//! MIME type at all.

/// MIME types the pixel backend decodes directly.
pub const DIRECT_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/avif",
];

const HEIC_MIME_TYPES: &[&str] = &["image/heic", "image/heif"];

/// MIME types that carry no format information.
const GENERIC_MIME_TYPES: &[&str] = &["", "application/octet-stream"];

/// How an input enters the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    Direct,
    NeedsHeicNormalization,
    Unsupported,
}

impl FormatClass {
    pub fn is_supported(self) -> bool {
        self != FormatClass::Unsupported
    }
}

/// Classify an input by declared MIME type and filename.
pub fn classify(mime: &str, name: &str) -> FormatClass {
    let mime = essence(mime);
    if DIRECT_MIME_TYPES.contains(&mime.as_str()) {
        FormatClass::Direct
    } else if HEIC_MIME_TYPES.contains(&mime.as_str())
        || (GENERIC_MIME_TYPES.contains(&mime.as_str()) && has_heic_extension(name))
    {
        FormatClass::NeedsHeicNormalization
    } else {
        FormatClass::Unsupported
    }
}

/// Lowercased MIME type without parameters (`"Image/PNG; q=1"` → `"image/png"`).
fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn has_heic_extension(name: &str) -> bool {
    matches!(extension(name).as_deref(), Some("heic" | "heif"))
}

/// MIME type for a filename, from its extension.
///
/// Used by file acquisition to declare a type the way a browser would.
/// Returns `None` for extensions outside the supported set.
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    match extension(name)?.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "avif" => Some("image/avif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
