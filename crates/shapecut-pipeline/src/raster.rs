//! Scan-line polygon rasterization into a coverage mask.
//!
//! For every row between the polygon's vertical extent (clipped to the
//! image), each edge that straddles the row contributes one crossing:
//! an edge straddles row `y` when exactly one endpoint has `py <= y` and
//! the other `py > y`. The crossing x is interpolated with integer
//! arithmetic, truncating toward zero. Crossings are sorted and filled
//! in inclusive pairs `[0, 1]`, `[2, 3]`, ...; a trailing unpaired crossing
//! is dropped. This is the even-odd rule, so self-intersecting outlines
//! fill without special handling.
//!
//! Horizontal edges never straddle a row. Under
//! [`HorizontalEdges::EndpointPair`] a horizontal edge lying exactly on
//! the row adds both of its endpoint x-coordinates instead.

use image::GrayImage;

use crate::types::{Dimensions, HorizontalEdges, PipelineError, PixelPoint, Polygon};

/// Per-pixel inside/outside coverage for one image.
///
/// Never modified after rasterization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    dimensions: Dimensions,
    covered: Vec<bool>,
}

impl Mask {
    /// An empty mask covering `dimensions`.
    #[must_use]
    pub fn empty(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            covered: vec![false; pixel_len(dimensions)],
        }
    }

    /// Dimensions of the image this mask covers.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Whether pixel `(x, y)` is inside the shape. Out-of-range
    /// coordinates are outside.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.dimensions.width
            && y < self.dimensions.height
            && self.covered[y as usize * self.dimensions.width as usize + x as usize]
    }

    /// Number of covered pixels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.covered.iter().filter(|&&c| c).count()
    }

    /// Returns `true` if no pixel is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.covered.iter().any(|&c| c)
    }

    /// Render as a binary image: 255 inside, 0 outside.
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.dimensions.width, self.dimensions.height, |x, y| {
            image::Luma([if self.contains(x, y) { 255 } else { 0 }])
        })
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn fill_span(&mut self, y: i64, start: i64, end: i64) {
        let row = y as usize * self.dimensions.width as usize;
        for x in start..=end {
            self.covered[row + x as usize] = true;
        }
    }
}

fn pixel_len(dimensions: Dimensions) -> usize {
    dimensions.width as usize * dimensions.height as usize
}

/// Collect the sorted crossings of every polygon edge with row `y`.
fn crossings(polygon: &Polygon, y: i64, horizontal: HorizontalEdges, out: &mut Vec<i64>) {
    out.clear();
    for (p1, p2) in polygon.edges() {
        let (x1, y1) = widen(p1);
        let (x2, y2) = widen(p2);
        if y1 == y2 {
            if y1 == y && horizontal == HorizontalEdges::EndpointPair {
                out.push(x1);
                out.push(x2);
            }
            continue;
        }
        if (y1 <= y && y2 > y) || (y2 <= y && y1 > y) {
            // Integer division truncates toward zero.
            out.push(x1 + (y - y1) * (x2 - x1) / (y2 - y1));
        }
    }
    out.sort_unstable();
}

fn widen(p: PixelPoint) -> (i64, i64) {
    (i64::from(p.x), i64::from(p.y))
}

/// Fill a polygon into a mask over `dimensions`.
///
/// Pixels outside the image are clipped; every covered pixel lies inside
/// it. Rasterizing the same polygon twice gives identical masks.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateShape`] if the polygon has fewer
/// than three vertices.
pub fn rasterize(
    polygon: &Polygon,
    dimensions: Dimensions,
    horizontal: HorizontalEdges,
) -> Result<Mask, PipelineError> {
    ensure_polygon(polygon)?;
    let mut mask = Mask::empty(dimensions);
    let Some((min_y, max_y)) = polygon.y_range() else {
        return Ok(mask);
    };

    let last_x = i64::from(dimensions.width) - 1;
    let first_y = i64::from(min_y).max(0);
    let last_y = i64::from(max_y).min(i64::from(dimensions.height) - 1);

    let mut xs = Vec::new();
    for y in first_y..=last_y {
        crossings(polygon, y, horizontal, &mut xs);
        for (start, end) in spans(&xs, last_x) {
            mask.fill_span(y, start, end);
        }
    }
    Ok(mask)
}

/// Pair sorted crossings into inclusive spans clipped to `[0, last_x]`.
///
/// A trailing unpaired crossing is dropped; spans clipped to nothing are
/// skipped.
fn spans(xs: &[i64], last_x: i64) -> impl Iterator<Item = (i64, i64)> + '_ {
    xs.chunks_exact(2)
        .map(move |pair| (pair[0].max(0), pair[1].min(last_x)))
        .filter(|(start, end)| start <= end)
}

/// Reject polygons that cannot enclose any area.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateShape`] when `polygon` has fewer
/// than three vertices.
pub const fn ensure_polygon(polygon: &Polygon) -> Result<(), PipelineError> {
    if polygon.len() < 3 {
        return Err(PipelineError::DegenerateShape {
            points: polygon.len(),
        });
    }
    Ok(())
}
