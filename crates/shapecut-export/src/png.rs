//! PNG encoding for in-memory rasters.
//!
//! Pure functions with no I/O: each returns the encoded bytes.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use shapecut_pipeline::types::{GrayImage, RgbaImage};

use crate::ExportError;

fn encode(
    raw: &[u8],
    width: u32,
    height: u32,
    color: ExtendedColorType,
) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(raw, width, height, color)?;
    Ok(buf)
}

/// Encode an RGBA image as PNG, keeping the alpha channel.
///
/// # Errors
///
/// Returns [`ExportError::Png`] if the encoder rejects the image.
pub fn encode_rgba(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    encode(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )
}

/// Encode a single-channel image as 8-bit grayscale PNG.
///
/// # Errors
///
/// Returns [`ExportError::Png`] if the encoder rejects the image.
pub fn encode_gray(image: &GrayImage) -> Result<Vec<u8>, ExportError> {
    encode(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::L8,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rgba_round_trips_with_alpha() {
        let img = RgbaImage::from_fn(7, 5, |x, y| {
            image::Rgba([
                u8::try_from(x * 30).unwrap(),
                u8::try_from(y * 40).unwrap(),
                9,
                if x % 2 == 0 { 0 } else { 255 },
            ])
        });
        let bytes = encode_rgba(&img).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(back, img);
    }

    #[test]
    fn gray_round_trips() {
        let img = GrayImage::from_fn(4, 6, |x, y| image::Luma([if x == y { 255 } else { 0 }]));
        let bytes = encode_gray(&img).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!(back.color(), image::ColorType::L8);
        assert_eq!(back.to_luma8(), img);
    }
}
