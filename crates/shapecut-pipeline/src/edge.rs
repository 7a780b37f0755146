//! Edge detection and edge-pixel classification.
//!
//! Wraps [`crate::canny::canny`] with threshold clamping and defines what
//! counts as an edge pixel for the density heatmap: any sample strictly
//! brighter than the configured cut-off (128 by default).

use image::GrayImage;

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero lets every pixel with any gradient at all
/// join an edge, flooding the heatmap with noise.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge.
/// Both thresholds are clamped to at least [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to be at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    crate::canny::canny(image, low, high)
}

/// Whether a sample in an edge map counts as an edge pixel.
#[must_use]
pub const fn is_edge(value: u8, cutoff: u8) -> bool {
    value > cutoff
}

/// Count the edge pixels in an edge map.
#[must_use]
pub fn count_edge_pixels(edges: &GrayImage, cutoff: u8) -> u64 {
    edges
        .pixels()
        .map(|p| u64::from(is_edge(p.0[0], cutoff)))
        .sum()
}
