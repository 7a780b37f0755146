//! Canny edge detection without the built-in pre-blur.
//!
//! `imageproc::edges::canny` always applies its own sigma-1.4 Gaussian
//! before computing gradients, and its hysteresis pass can underflow
//! `u32` coordinates when tracing reaches the image border
//! (<https://github.com/image-rs/imageproc/issues/705>). Smoothing here is
//! a separate, configurable pipeline stage, so this module starts
//! directly from the Sobel gradients of its input and bounds-checks
//! every neighbor during hysteresis.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Run Sobel gradients, non-maximum suppression, and hysteresis.
///
/// Returns a binary image: 255 for edge pixels, 0 elsewhere. The outer
/// one-pixel frame is never marked as a strong edge, but weak edges
/// connected to a strong one may extend into it.
///
/// Callers must ensure `low_threshold <= high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let magnitude: Vec<f32> = gx
        .as_raw()
        .iter()
        .zip(gy.as_raw())
        .map(|(&h, &v)| f32::from(h).hypot(f32::from(v)))
        .collect();

    let grid = Grid {
        width: w as usize,
        height: h as usize,
    };
    let thinned = non_maximum_suppression(&grid, &magnitude, gx.as_raw(), gy.as_raw());
    let edges = hysteresis(&grid, &thinned, low_threshold, high_threshold);
    GrayImage::from_fn(w, h, |x, y| Luma([edges[grid.index(x as usize, y as usize)]]))
}

/// Row-major indexing helper for the flat gradient buffers.
struct Grid {
    width: usize,
    height: usize,
}

impl Grid {
    const fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// The 8-connected neighbors of `(x, y)` that lie inside the grid.
    fn neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        const OFFSETS: [(isize, isize); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let nx = x.checked_add_signed(dx)?;
            let ny = y.checked_add_signed(dy)?;
            (nx < self.width && ny < self.height).then_some((nx, ny))
        })
    }
}

/// Keep only pixels that are local maxima along their gradient direction.
fn non_maximum_suppression(grid: &Grid, magnitude: &[f32], gx: &[i16], gy: &[i16]) -> Vec<f32> {
    let mut out = vec![0.0; magnitude.len()];
    for y in 1..grid.height - 1 {
        for x in 1..grid.width - 1 {
            let idx = grid.index(x, y);
            let mut angle = f32::from(gy[idx]).atan2(f32::from(gx[idx])).to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }

            let (a, b) = if (22.5..67.5).contains(&angle) {
                (grid.index(x + 1, y + 1), grid.index(x - 1, y - 1))
            } else if (67.5..112.5).contains(&angle) {
                (grid.index(x, y - 1), grid.index(x, y + 1))
            } else if (112.5..157.5).contains(&angle) {
                (grid.index(x - 1, y + 1), grid.index(x + 1, y - 1))
            } else {
                (grid.index(x - 1, y), grid.index(x + 1, y))
            };

            let value = magnitude[idx];
            if value >= magnitude[a] && value >= magnitude[b] {
                out[idx] = value;
            }
        }
    }
    out
}

/// Mark strong edges and every weak edge 8-connected to one.
///
/// Iterative depth-first flood from each strong seed.
fn hysteresis(grid: &Grid, thinned: &[f32], low: f32, high: f32) -> Vec<u8> {
    let mut out = vec![0_u8; thinned.len()];
    let mut stack = Vec::new();
    for y in 1..grid.height - 1 {
        for x in 1..grid.width - 1 {
            let idx = grid.index(x, y);
            if thinned[idx] < high || out[idx] != 0 {
                continue;
            }
            out[idx] = 255;
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                for (nx, ny) in grid.neighbors(cx, cy) {
                    let nidx = grid.index(nx, ny);
                    if thinned[nidx] >= low && out[nidx] == 0 {
                        out[nidx] = 255;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}
