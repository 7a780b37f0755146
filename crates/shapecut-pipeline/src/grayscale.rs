//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGBA
//! source used for compositing plus a single-channel grayscale copy used
//! for edge analysis. The source itself is never modified by analysis.

use image::GrayImage;

use crate::types::{PipelineError, RgbaImage};

/// Decode raw image bytes into an RGBA image.
///
/// Supports whatever formats the `image` crate was built with.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}

/// Convert an RGBA image to grayscale, one output sample per pixel.
///
/// Uses the `image` crate's luma reduction (Rec. 709 weights), so green
/// contributes most and blue least. Alpha is ignored.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &RgbaImage) -> GrayImage {
    image::DynamicImage::ImageRgba8(image.clone()).to_luma8()
}
