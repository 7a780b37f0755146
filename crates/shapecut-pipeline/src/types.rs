//! Shared types for the shapecut challenge pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// decoded source and the composited outputs without depending on
/// `image` directly.
pub use image::RgbaImage;

/// An integer point in pixel space.
///
/// Coordinates are signed: generated outlines may extend past the image
/// on any side, and the rasterizer clips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl PixelPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An ordered, implicitly closed sequence of integer vertices.
///
/// The last vertex connects back to the first; the closing edge is not
/// stored as a separate vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon(Vec<PixelPoint>);

impl Polygon {
    /// Create a polygon from its vertices in outline order.
    #[must_use]
    pub const fn new(points: Vec<PixelPoint>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[PixelPoint] {
        &self.0
    }

    /// Iterate over every edge as `(start, end)`, including the closing
    /// edge from the last vertex back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (PixelPoint, PixelPoint)> + '_ {
        let n = self.0.len();
        (0..n).map(move |i| (self.0[i], self.0[(i + 1) % n]))
    }

    /// Inclusive vertical extent `(min_y, max_y)`, or `None` when empty.
    #[must_use]
    pub fn y_range(&self) -> Option<(i32, i32)> {
        let min = self.0.iter().map(|p| p.y).min()?;
        let max = self.0.iter().map(|p| p.y).max()?;
        Some((min, max))
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A rectangle in pixel space, used for the selected heatmap cell.
///
/// Always lies inside the image it was computed from:
/// `x + width <= image width` and `y + height <= image height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Create a new region.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The region covering an entire image.
    #[must_use]
    pub const fn full(dimensions: Dimensions) -> Self {
        Self::new(0, 0, dimensions.width, dimensions.height)
    }

    /// Center of the region using integer halving of the size, so odd
    /// sizes round the center toward the origin.
    #[must_use]
    pub fn center(self) -> (f64, f64) {
        (
            f64::from(self.x + self.width / 2),
            f64::from(self.y + self.height / 2),
        )
    }

    /// The smaller of width and height.
    #[must_use]
    pub fn min_side(self) -> u32 {
        self.width.min(self.height)
    }

    /// Whether the region lies entirely inside `dimensions`.
    #[must_use]
    pub const fn fits_within(self, dimensions: Dimensions) -> bool {
        self.x as u64 + self.width as u64 <= dimensions.width as u64
            && self.y as u64 + self.height as u64 <= dimensions.height as u64
    }
}

/// Where the generated shape is placed and how it is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlacementMode {
    /// Centered on the densest heatmap cell, scaled by the cell size.
    #[default]
    RegionConstrained,
    /// Centered on the whole image, scaled by the image size.
    FullImage,
}

/// Border handling for the pre-edge-detection blur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlurBorder {
    /// Samples outside the image read as zero (black).
    #[default]
    Zero,
    /// Samples outside the image replicate the nearest edge pixel.
    Clamp,
}

/// How the scan-line rasterizer treats edges with `start.y == end.y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HorizontalEdges {
    /// A horizontal edge lying on the scan line contributes both of its
    /// endpoint x-coordinates as intersections.
    #[default]
    EndpointPair,
    /// Horizontal edges never contribute (strict even-odd crossing rule).
    Skip,
}

/// Configuration for challenge generation.
///
/// All parameters have defaults matching the historical generator.
/// Call [`validate`](Self::validate) before use; the pipeline entry
/// points do so automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Heatmap rows.
    pub grid_rows: u32,
    /// Heatmap columns.
    pub grid_cols: u32,
    /// Whether to smooth the grayscale image before edge detection.
    pub apply_blur: bool,
    /// Blur kernel radius in pixels (kernel width is `2 * radius + 1`).
    pub blur_radius: u32,
    /// Blur kernel sigma.
    pub blur_sigma: f32,
    /// Blur border handling.
    pub blur_border: BlurBorder,
    /// Canny low (weak edge) threshold.
    pub canny_low: f32,
    /// Canny high (strong edge) threshold.
    pub canny_high: f32,
    /// A pixel counts as an edge when its value is strictly above this.
    pub edge_cutoff: u8,
    /// Shape placement mode.
    pub placement: PlacementMode,
    /// Shape scale as a fraction of the region's smaller side
    /// ([`PlacementMode::RegionConstrained`]).
    pub region_scale: f64,
    /// Shape scale as a fraction of the image's smaller side
    /// ([`PlacementMode::FullImage`]).
    pub full_image_scale: f64,
    /// Rasterizer treatment of horizontal edges.
    pub horizontal_edges: HorizontalEdges,
    /// Allowed per-axis deviation, in pixels, for a passing attempt.
    pub tolerance: u32,
    /// Images narrower or shorter than this are rejected.
    pub min_image_side: u32,
}

impl ChallengeConfig {
    /// Default heatmap rows.
    pub const DEFAULT_GRID_ROWS: u32 = 5;
    /// Default heatmap columns.
    pub const DEFAULT_GRID_COLS: u32 = 5;
    /// Default blur radius.
    pub const DEFAULT_BLUR_RADIUS: u32 = 7;
    /// Default blur sigma.
    pub const DEFAULT_BLUR_SIGMA: f32 = 3.0;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 10.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 100.0;
    /// Default edge brightness cut-off.
    pub const DEFAULT_EDGE_CUTOFF: u8 = 128;
    /// Default region-constrained scale.
    pub const DEFAULT_REGION_SCALE: f64 = 0.4;
    /// Default full-image scale.
    pub const DEFAULT_FULL_IMAGE_SCALE: f64 = 0.2;
    /// Default validation tolerance in pixels.
    pub const DEFAULT_TOLERANCE: u32 = 10;
    /// Default minimum image side.
    pub const DEFAULT_MIN_IMAGE_SIDE: u32 = 20;

    /// The scale factor for the configured placement mode.
    #[must_use]
    pub const fn scale_factor(&self) -> f64 {
        match self.placement {
            PlacementMode::RegionConstrained => self.region_scale,
            PlacementMode::FullImage => self.full_image_scale,
        }
    }

    /// Check the configuration for values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.grid_rows == 0 || self.grid_cols == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "grid must have at least one row and column, got {}x{}",
                self.grid_rows, self.grid_cols,
            )));
        }
        if self.apply_blur && !(self.blur_sigma > 0.0 && self.blur_sigma.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "blur_sigma must be positive and finite, got {}",
                self.blur_sigma,
            )));
        }
        if !(self.canny_low.is_finite() && self.canny_high.is_finite()) {
            return Err(PipelineError::InvalidConfig(
                "canny thresholds must be finite".to_string(),
            ));
        }
        if self.canny_low > self.canny_high {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low ({}) exceeds canny_high ({})",
                self.canny_low, self.canny_high,
            )));
        }
        let scale = self.scale_factor();
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "shape scale must be positive and finite, got {scale}",
            )));
        }
        Ok(())
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            grid_rows: Self::DEFAULT_GRID_ROWS,
            grid_cols: Self::DEFAULT_GRID_COLS,
            apply_blur: true,
            blur_radius: Self::DEFAULT_BLUR_RADIUS,
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            blur_border: BlurBorder::default(),
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            edge_cutoff: Self::DEFAULT_EDGE_CUTOFF,
            placement: PlacementMode::default(),
            region_scale: Self::DEFAULT_REGION_SCALE,
            full_image_scale: Self::DEFAULT_FULL_IMAGE_SCALE,
            horizontal_edges: HorizontalEdges::default(),
            tolerance: Self::DEFAULT_TOLERANCE,
            min_image_side: Self::DEFAULT_MIN_IMAGE_SIDE,
        }
    }
}

/// Errors that can occur while generating a challenge.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The image is too small for the heatmap grid.
    #[error("image {width}x{height} is too small for a {rows}x{cols} heatmap grid")]
    InvalidRegion {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Grid rows.
        rows: u32,
        /// Grid columns.
        cols: u32,
    },

    /// The polygon has fewer than three vertices.
    #[error("degenerate shape: {points} points, need at least 3")]
    DegenerateShape {
        /// Number of vertices found.
        points: usize,
    },

    /// A mask does not cover the image it is applied to.
    #[error("mask is {mask:?} but image is {image:?}")]
    DimensionMismatch {
        /// Mask dimensions.
        mask: Dimensions,
        /// Image dimensions.
        image: Dimensions,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn polygon_edges_include_closing_edge() {
        let poly = Polygon::new(vec![
            PixelPoint::new(0, 0),
            PixelPoint::new(4, 0),
            PixelPoint::new(4, 3),
        ]);
        let edges: Vec<_> = poly.edges().collect();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2], (PixelPoint::new(4, 3), PixelPoint::new(0, 0)));
    }

    #[test]
    fn polygon_y_range() {
        let poly = Polygon::new(vec![
            PixelPoint::new(0, 5),
            PixelPoint::new(2, -3),
            PixelPoint::new(7, 9),
        ]);
        assert_eq!(poly.y_range(), Some((-3, 9)));
        assert_eq!(Polygon::new(vec![]).y_range(), None);
    }

    #[test]
    fn region_center_halves_with_integer_division() {
        let region = Region::new(10, 20, 15, 9);
        assert_eq!(region.center(), (17.0, 24.0));
    }

    #[test]
    fn region_fits_within_dimensions() {
        let dims = Dimensions {
            width: 100,
            height: 50,
        };
        assert!(Region::new(80, 40, 20, 10).fits_within(dims));
        assert!(!Region::new(81, 40, 20, 10).fits_within(dims));
        assert!(Region::full(dims).fits_within(dims));
    }

    #[test]
    fn config_defaults_match_historical_generator() {
        let config = ChallengeConfig::default();
        assert_eq!(config.grid_rows, 5);
        assert_eq!(config.grid_cols, 5);
        assert!(config.apply_blur);
        assert_eq!(config.blur_radius, 7);
        assert!((config.blur_sigma - 3.0).abs() < f32::EPSILON);
        assert!((config.canny_low - 10.0).abs() < f32::EPSILON);
        assert!((config.canny_high - 100.0).abs() < f32::EPSILON);
        assert_eq!(config.edge_cutoff, 128);
        assert_eq!(config.placement, PlacementMode::RegionConstrained);
        assert!((config.scale_factor() - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.tolerance, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn full_image_mode_uses_full_image_scale() {
        let config = ChallengeConfig {
            placement: PlacementMode::FullImage,
            ..ChallengeConfig::default()
        };
        assert!((config.scale_factor() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_empty_grid() {
        let config = ChallengeConfig {
            grid_cols: 0,
            ..ChallengeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_inverted_thresholds() {
        let config = ChallengeConfig {
            canny_low: 200.0,
            canny_high: 100.0,
            ..ChallengeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_ignores_sigma_when_blur_disabled() {
        let config = ChallengeConfig {
            apply_blur: false,
            blur_sigma: 0.0,
            ..ChallengeConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn error_display_messages() {
        let err = PipelineError::DegenerateShape { points: 2 };
        assert_eq!(err.to_string(), "degenerate shape: 2 points, need at least 3");
        let err = PipelineError::InvalidRegion {
            width: 3,
            height: 3,
            rows: 5,
            cols: 5,
        };
        assert_eq!(
            err.to_string(),
            "image 3x3 is too small for a 5x5 heatmap grid"
        );
    }

    #[test]
    fn config_serde_round_trip() {
        let config = ChallengeConfig {
            apply_blur: false,
            placement: PlacementMode::FullImage,
            horizontal_edges: HorizontalEdges::Skip,
            tolerance: 4,
            ..ChallengeConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ChallengeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn config_partial_json_fills_defaults() {
        let config: ChallengeConfig = serde_json::from_str(r#"{"grid_rows": 3}"#).unwrap();
        assert_eq!(config.grid_rows, 3);
        assert_eq!(config.grid_cols, ChallengeConfig::DEFAULT_GRID_COLS);
    }
}
