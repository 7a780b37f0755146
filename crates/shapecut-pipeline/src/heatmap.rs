//! Edge-density heatmap and target region selection.
//!
//! The edge map is partitioned into a fixed grid of `rows x cols` blocks,
//! each `floor(width / cols) x floor(height / rows)` pixels. Every edge
//! pixel increments the block it falls in; pixels in the truncation
//! remainder along the right and bottom borders belong to no block and
//! are not counted. The busiest block becomes the region the shape is
//! drawn in.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::edge;
use crate::types::{ChallengeConfig, Dimensions, PipelineError, Region, RgbaImage};

/// Edge-pixel counts per grid block, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapGrid {
    rows: u32,
    cols: u32,
    block_width: u32,
    block_height: u32,
    cells: Vec<u64>,
}

/// The selected heatmap cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Grid row.
    pub row: u32,
    /// Grid column.
    pub col: u32,
    /// Edge pixels counted in the cell.
    pub count: u64,
}

impl HeatmapGrid {
    /// An all-zero grid for an image of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRegion`] when the image is too
    /// small to give every block a non-zero size.
    pub fn new(dimensions: Dimensions, rows: u32, cols: u32) -> Result<Self, PipelineError> {
        let invalid = || PipelineError::InvalidRegion {
            width: dimensions.width,
            height: dimensions.height,
            rows,
            cols,
        };
        let block_width = dimensions.width.checked_div(cols).ok_or_else(invalid)?;
        let block_height = dimensions.height.checked_div(rows).ok_or_else(invalid)?;
        if block_width == 0 || block_height == 0 {
            return Err(invalid());
        }
        Ok(Self {
            rows,
            cols,
            block_width,
            block_height,
            cells: vec![0; rows as usize * cols as usize],
        })
    }

    /// Build a grid from precomputed row-major counts.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when `cells` does not hold
    /// exactly `rows * cols` counts or any dimension is zero.
    pub fn from_counts(
        rows: u32,
        cols: u32,
        block_width: u32,
        block_height: u32,
        cells: Vec<u64>,
    ) -> Result<Self, PipelineError> {
        if rows == 0 || cols == 0 || block_width == 0 || block_height == 0 {
            return Err(PipelineError::InvalidConfig(
                "heatmap grid and block sizes must be non-zero".to_string(),
            ));
        }
        if cells.len() != rows as usize * cols as usize {
            return Err(PipelineError::InvalidConfig(format!(
                "expected {} heatmap cells, got {}",
                rows as usize * cols as usize,
                cells.len(),
            )));
        }
        Ok(Self {
            rows,
            cols,
            block_width,
            block_height,
            cells,
        })
    }

    /// Count the edge pixels of `edges` into a fresh grid.
    ///
    /// # Errors
    ///
    /// Same as [`HeatmapGrid::new`].
    pub fn accumulate(
        edges: &GrayImage,
        rows: u32,
        cols: u32,
        cutoff: u8,
    ) -> Result<Self, PipelineError> {
        let (width, height) = edges.dimensions();
        let mut grid = Self::new(Dimensions { width, height }, rows, cols)?;
        for (x, y, pixel) in edges.enumerate_pixels() {
            if !edge::is_edge(pixel.0[0], cutoff) {
                continue;
            }
            let row = y / grid.block_height;
            let col = x / grid.block_width;
            if row < grid.rows && col < grid.cols {
                grid.cells[(row * grid.cols + col) as usize] += 1;
            }
        }
        Ok(grid)
    }

    /// Number of grid rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of grid columns.
    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    /// Block size as `(width, height)` in pixels.
    #[must_use]
    pub const fn block_size(&self) -> (u32, u32) {
        (self.block_width, self.block_height)
    }

    /// The count at `(row, col)`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, row: u32, col: u32) -> Option<u64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get((row * self.cols + col) as usize).copied()
    }

    /// Row-major view of all counts.
    #[must_use]
    pub fn cells(&self) -> &[u64] {
        &self.cells
    }

    /// Sum over every cell.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.cells.iter().sum()
    }

    /// The first cell, in row-major order, holding the maximum count.
    ///
    /// Ties go to the earliest row, then the earliest column.
    #[must_use]
    pub fn hottest(&self) -> Hotspot {
        let mut best = Hotspot {
            row: 0,
            col: 0,
            count: self.cells.first().copied().unwrap_or(0),
        };
        for row in 0..self.rows {
            for col in 0..self.cols {
                let count = self.cells[(row * self.cols + col) as usize];
                if count > best.count {
                    best = Hotspot { row, col, count };
                }
            }
        }
        best
    }

    /// The pixel-space rectangle of a grid cell.
    #[must_use]
    pub const fn cell_region(&self, row: u32, col: u32) -> Region {
        Region::new(
            col * self.block_width,
            row * self.block_height,
            self.block_width,
            self.block_height,
        )
    }
}

/// Everything the edge-density analysis produced for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeAnalysis {
    /// Binary edge map (255 = edge).
    pub edges: GrayImage,
    /// Edge-pixel counts per block.
    pub heatmap: HeatmapGrid,
    /// The busiest block.
    pub hotspot: Hotspot,
    /// The busiest block in pixel space.
    pub region: Region,
}

/// Reject images that cannot be partitioned by the configured grid.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRegion`] when either side is below
/// `config.min_image_side` or too short to give each block a pixel.
pub fn check_dimensions(
    dimensions: Dimensions,
    config: &ChallengeConfig,
) -> Result<(), PipelineError> {
    let too_small = dimensions.width < config.min_image_side.max(config.grid_cols)
        || dimensions.height < config.min_image_side.max(config.grid_rows);
    if too_small {
        return Err(PipelineError::InvalidRegion {
            width: dimensions.width,
            height: dimensions.height,
            rows: config.grid_rows,
            cols: config.grid_cols,
        });
    }
    Ok(())
}

/// Smooth `gray` for edge detection, or `None` when `apply_blur` is off.
#[must_use]
pub fn smooth(gray: &GrayImage, config: &ChallengeConfig) -> Option<GrayImage> {
    config.apply_blur.then(|| {
        crate::blur::gaussian_blur(
            gray,
            config.blur_radius,
            config.blur_sigma,
            config.blur_border,
        )
    })
}

/// Canny with the configured thresholds.
#[must_use = "returns the binary edge map"]
pub fn detect_edges(smoothed: &GrayImage, config: &ChallengeConfig) -> GrayImage {
    edge::canny(smoothed, config.canny_low, config.canny_high)
}

/// Produce the binary edge map for a grayscale image: [`smooth`], then
/// [`detect_edges`].
#[must_use = "returns the binary edge map"]
pub fn edge_map(gray: &GrayImage, config: &ChallengeConfig) -> GrayImage {
    match smooth(gray, config) {
        Some(blurred) => detect_edges(&blurred, config),
        None => detect_edges(gray, config),
    }
}

/// Count edges per block and pick the busiest block.
///
/// # Errors
///
/// Same as [`HeatmapGrid::new`].
pub fn select_region(
    edges: &GrayImage,
    config: &ChallengeConfig,
) -> Result<(HeatmapGrid, Hotspot, Region), PipelineError> {
    let heatmap =
        HeatmapGrid::accumulate(edges, config.grid_rows, config.grid_cols, config.edge_cutoff)?;
    let hotspot = heatmap.hottest();
    let region = heatmap.cell_region(hotspot.row, hotspot.col);
    tracing::debug!(
        row = hotspot.row,
        col = hotspot.col,
        count = hotspot.count,
        total = heatmap.total(),
        "selected heatmap cell",
    );
    Ok((heatmap, hotspot, region))
}

/// Find the busiest region of an image.
///
/// Converts to grayscale, smooths (when enabled), extracts edges, and
/// selects the densest grid block. The source image is only read.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an invalid configuration
/// and [`PipelineError::InvalidRegion`] for an image too small for the grid.
pub fn analyze(image: &RgbaImage, config: &ChallengeConfig) -> Result<EdgeAnalysis, PipelineError> {
    config.validate()?;
    let (width, height) = image.dimensions();
    check_dimensions(Dimensions { width, height }, config)?;

    let gray = crate::grayscale::to_grayscale(image);
    let edges = edge_map(&gray, config);
    let (heatmap, hotspot, region) = select_region(&edges, config)?;
    Ok(EdgeAnalysis {
        edges,
        heatmap,
        hotspot,
        region,
    })
}
