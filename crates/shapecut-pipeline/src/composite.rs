//! Mask-driven compositing of the three challenge images.
//!
//! Each operation reads the source image and writes a fresh buffer, so
//! they can run in any order or in parallel.

use image::Rgba;

use crate::raster::{Mask, ensure_polygon};
use crate::types::{Dimensions, PipelineError, PixelPoint, Polygon, RgbaImage};

/// Color of the outline drawn by [`outline_debug`].
pub const OUTLINE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Emitted outside the mask by [`extract_interior`].
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Emitted inside the mask by [`fill_interior_white`].
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Integer line rasterization from `from` to `to`, endpoints included.
///
/// Steps one pixel at a time with a shared error term for both axes, so
/// it works the same in every octant. Points may lie outside any image.
#[must_use]
// Both coordinates stay between the i32 endpoints.
#[allow(clippy::cast_possible_truncation)]
pub fn line_points(from: PixelPoint, to: PixelPoint) -> Vec<PixelPoint> {
    let (mut x, mut y) = (i64::from(from.x), i64::from(from.y));
    let (x1, y1) = (i64::from(to.x), i64::from(to.y));
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut points = Vec::new();
    loop {
        points.push(PixelPoint::new(x as i32, y as i32));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > dy {
            err += dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
    points
}

fn put_if_inside(image: &mut RgbaImage, p: PixelPoint, color: Rgba<u8>) {
    let (Ok(x), Ok(y)) = (u32::try_from(p.x), u32::try_from(p.y)) else {
        return;
    };
    if x < image.width() && y < image.height() {
        image.put_pixel(x, y, color);
    }
}

/// Copy `image` and draw the polygon outline over it in
/// [`OUTLINE_COLOR`], including the closing segment. Pixels outside the
/// image are skipped.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateShape`] for fewer than three
/// vertices.
pub fn outline_debug(image: &RgbaImage, polygon: &Polygon) -> Result<RgbaImage, PipelineError> {
    ensure_polygon(polygon)?;
    let mut out = image.clone();
    for (from, to) in polygon.edges() {
        for p in line_points(from, to) {
            put_if_inside(&mut out, p, OUTLINE_COLOR);
        }
    }
    Ok(out)
}

fn check_mask(image: &RgbaImage, mask: &Mask) -> Result<(), PipelineError> {
    let (width, height) = image.dimensions();
    let image = Dimensions { width, height };
    if mask.dimensions() != image {
        return Err(PipelineError::DimensionMismatch {
            mask: mask.dimensions(),
            image,
        });
    }
    Ok(())
}

/// The shape's interior cut out of `image`, fully transparent elsewhere.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the mask was built for
/// a different image size.
pub fn extract_interior(image: &RgbaImage, mask: &Mask) -> Result<RgbaImage, PipelineError> {
    check_mask(image, mask)?;
    Ok(RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.contains(x, y) {
            *image.get_pixel(x, y)
        } else {
            TRANSPARENT
        }
    }))
}

/// `image` with the shape's interior painted opaque white.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the mask was built for
/// a different image size.
pub fn fill_interior_white(image: &RgbaImage, mask: &Mask) -> Result<RgbaImage, PipelineError> {
    check_mask(image, mask)?;
    Ok(RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.contains(x, y) {
            WHITE
        } else {
            *image.get_pixel(x, y)
        }
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::rasterize;
    use crate::types::HorizontalEdges;

    fn p(x: i32, y: i32) -> PixelPoint {
        PixelPoint::new(x, y)
    }

    /// Opaque gray gradient, never pure white.
    fn source(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = u8::try_from((x + y) % 200).unwrap();
            Rgba([v, v / 2, 100, 255])
        })
    }

    fn triangle() -> Polygon {
        Polygon::new(vec![p(5, 5), p(30, 8), p(12, 28)])
    }

    #[test]
    fn horizontal_and_vertical_lines() {
        assert_eq!(line_points(p(0, 0), p(3, 0)), vec![p(0, 0), p(1, 0), p(2, 0), p(3, 0)]);
        assert_eq!(line_points(p(2, 3), p(2, 1)), vec![p(2, 3), p(2, 2), p(2, 1)]);
        assert_eq!(line_points(p(4, 4), p(4, 4)), vec![p(4, 4)]);
    }

    #[test]
    fn lines_are_connected_in_every_octant() {
        let center = p(0, 0);
        for target in [p(7, 3), p(3, 7), p(-3, 7), p(-7, 3), p(-7, -3), p(-3, -7), p(3, -7), p(7, -3)] {
            let line = line_points(center, target);
            assert_eq!(line.first(), Some(&center));
            assert_eq!(line.last(), Some(&target));
            assert_eq!(line.len(), 8, "one pixel per step along the major axis");
            for w in line.windows(2) {
                assert!((w[0].x - w[1].x).abs() <= 1 && (w[0].y - w[1].y).abs() <= 1);
            }
        }
    }

    #[test]
    fn error_ties_defer_the_tied_axis() {
        // A tie on either axis defers that axis by one pixel.
        assert_eq!(line_points(p(0, 0), p(1, 2)), vec![p(0, 0), p(0, 1), p(1, 2)]);
        assert_eq!(line_points(p(0, 0), p(2, 1)), vec![p(0, 0), p(1, 0), p(2, 1)]);
    }

    #[test]
    fn line_is_symmetric_for_diagonals() {
        assert_eq!(line_points(p(0, 0), p(4, 4)), (0..=4).map(|i| p(i, i)).collect::<Vec<_>>());
    }

    #[test]
    fn outline_draws_every_vertex_and_keeps_the_rest() {
        let src = source(40, 40);
        let out = outline_debug(&src, &triangle()).unwrap();
        for v in triangle().points() {
            let (x, y) = (u32::try_from(v.x).unwrap(), u32::try_from(v.y).unwrap());
            assert_eq!(*out.get_pixel(x, y), OUTLINE_COLOR);
        }
        assert_eq!(out.get_pixel(39, 39), src.get_pixel(39, 39));
    }

    #[test]
    fn outline_includes_closing_segment() {
        let out = outline_debug(&source(40, 40), &triangle()).unwrap();
        // Closing segment runs from (12, 28) back to (5, 5).
        let mid = line_points(p(12, 28), p(5, 5))[10];
        let (x, y) = (u32::try_from(mid.x).unwrap(), u32::try_from(mid.y).unwrap());
        assert_eq!(*out.get_pixel(x, y), OUTLINE_COLOR);
    }

    #[test]
    fn outline_clips_offscreen_segments() {
        let poly = Polygon::new(vec![p(-20, 5), p(50, 5), p(5, 50)]);
        let out = outline_debug(&source(30, 30), &poly).unwrap();
        assert_eq!(out.dimensions(), (30, 30));
        assert!(out.pixels().any(|px| *px == OUTLINE_COLOR));
    }

    #[test]
    fn degenerate_polygons_are_rejected() {
        let line = Polygon::new(vec![p(0, 0), p(5, 5)]);
        assert!(matches!(
            outline_debug(&source(10, 10), &line),
            Err(PipelineError::DegenerateShape { points: 2 })
        ));
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let mask = Mask::empty(Dimensions {
            width: 10,
            height: 12,
        });
        let img = source(12, 10);
        assert!(matches!(
            extract_interior(&img, &mask),
            Err(PipelineError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            fill_interior_white(&img, &mask),
            Err(PipelineError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn interior_and_white_fill_partition_the_image() {
        let src = source(40, 40);
        let dims = Dimensions {
            width: 40,
            height: 40,
        };
        let mask = rasterize(&triangle(), dims, HorizontalEdges::EndpointPair).unwrap();
        let interior = extract_interior(&src, &mask).unwrap();
        let white = fill_interior_white(&src, &mask).unwrap();

        assert!(!mask.is_empty());
        for (x, y, px) in interior.enumerate_pixels() {
            let opaque = px.0[3] != 0;
            let filled = *white.get_pixel(x, y) == WHITE;
            assert_eq!(opaque, filled, "pixel ({x}, {y})");
            assert_eq!(opaque, mask.contains(x, y));
            if opaque {
                assert_eq!(px, src.get_pixel(x, y));
            } else {
                assert_eq!(*px, TRANSPARENT);
                assert_eq!(white.get_pixel(x, y), src.get_pixel(x, y));
            }
        }
    }
}
