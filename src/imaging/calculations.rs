//! Pure calculation functions for image dimensions and size statistics.
//!
//! All functions here are pure and testable without any I/O or images.

/// Plan output dimensions under a maximum-dimension bound.
///
/// Images that already fit are returned unchanged, so nothing is ever
/// upscaled. Otherwise both edges are scaled by `max_dimension / longer_edge`
/// and each is rounded to the nearest integer independently. An edge never
/// rounds below one pixel.
///
/// # Arguments
/// * `width`, `height` - Natural dimensions of the decoded image
/// * `max_dimension` - Upper bound for either edge
///
/// # Returns
/// * `(width, height)` - Planned output dimensions
///
/// # Examples
/// ```
/// # use webp_batch::imaging::plan_dimensions;
/// // Fits already → untouched
/// assert_eq!(plan_dimensions(800, 600, 2000), (800, 600));
///
/// // Landscape over the bound → width pinned to the bound
/// assert_eq!(plan_dimensions(4000, 3000, 2000), (2000, 1500));
/// ```
pub fn plan_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f64 / width.max(height) as f64;
    let edge = |len: u32| ((len as f64 * scale).round() as u32).max(1);
    (edge(width), edge(height))
}

/// Percentage of bytes saved going from `original` to `output`.
///
/// Negative when the output is larger. Returns `None` for an empty original,
/// where the ratio is undefined.
pub fn savings_percent(original: u64, output: u64) -> Option<f64> {
    if original == 0 {
        return None;
    }
    Some((original as f64 - output as f64) / original as f64 * 100.0)
}
