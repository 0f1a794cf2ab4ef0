//! Image processing: decode, resample, WebP encode, HEIC pre-conversion.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory`, `avif-parse` + `rav1d` for AVIF |
//! | **Resample** | `resize_exact` with Lanczos3 |
//! | **Encode → WebP** | `webp` (libwebp, lossy) |
//! | **HEIC → JPEG** | `libheif-rs` (optional `heic` feature) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and savings math (unit testable)
//! - **Parameters**: Quality and resize descriptions
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **HEIC**: [`HeicCodec`] trait + implementations

pub mod backend;
mod calculations;
pub mod heic;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{plan_dimensions, savings_percent};
pub use heic::{HeicCodec, HeicError, UnavailableHeicCodec};
pub use params::{
    DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY, Quality, QualitySetting, ResizeParams,
};
pub use rust_backend::RustBackend;
