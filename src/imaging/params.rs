//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They sit between
//! the [`convert`](crate::convert) stage (which decides the target size and
//! quality) and the [`backend`](super::backend) (which does the pixel work),
//! so a mock backend can stand in for tests without changing the stage logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy WebP quality in percent (70–100, default 85). Clamped on construction.
//! - [`QualitySetting`]: The shared, updatable quality value read by every conversion.
//! - [`ResizeParams`]: Target pixel dimensions for a resample.

use std::sync::atomic::{AtomicU32, Ordering};

/// Lowest accepted quality, in percent.
pub const MIN_QUALITY: u32 = 70;
/// Highest accepted quality, in percent.
pub const MAX_QUALITY: u32 = 100;
/// Quality used until the caller picks another one.
pub const DEFAULT_QUALITY: u32 = 85;

/// Lossy WebP encoding quality in percent (70-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(percent: u32) -> Self {
        Self(percent.clamp(MIN_QUALITY, MAX_QUALITY))
    }

    /// Quality in percent, as shown to the user and stored on records.
    pub fn percent(self) -> u32 {
        self.0
    }

    /// Quality as a factor in `[0, 1]`, the form the encoder consumes.
    pub fn factor(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

/// Process-wide quality value, clamped on every update.
///
/// Conversions call [`get`](Self::get) once, when their encode step starts, and
/// keep the returned [`Quality`] by value. An update made while a batch is
/// running is therefore seen by files that have not started yet and never by
/// files already encoding or finished.
#[derive(Debug)]
pub struct QualitySetting(AtomicU32);

impl QualitySetting {
    pub fn new(initial: Quality) -> Self {
        Self(AtomicU32::new(initial.percent()))
    }

    /// Store a new value, clamping it into range. Returns what was stored.
    pub fn set(&self, percent: u32) -> Quality {
        let quality = Quality::new(percent);
        self.0.store(quality.percent(), Ordering::Relaxed);
        quality
    }

    pub fn get(&self) -> Quality {
        Quality(self.0.load(Ordering::Relaxed))
    }
}

impl Default for QualitySetting {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}

/// Parameters for a resample to exact dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
}
