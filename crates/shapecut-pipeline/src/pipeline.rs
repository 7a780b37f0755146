//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use rand::SeedableRng;
//! # use shapecut_pipeline::{ChallengeConfig, Pipeline, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let challenge = Pipeline::new(png, "cat", ChallengeConfig::default())
//!     .decode()?
//!     .analyze()?
//!     .generate_shape(&mut rng)
//!     .rasterize()?
//!     .composite()?
//!     .into_challenge();
//! # Ok(())
//! # }
//! ```
//!
//! [`Decoded::analyze`] is shorthand for the four analysis steps
//! ([`grayscale`](Decoded::grayscale), [`blur`](Grayscaled::blur),
//! [`detect_edges`](Blurred::detect_edges) and
//! [`select_region`](EdgesDetected::select_region)), which can also be
//! driven one at a time.
//!
//! Each stage method consumes `self` and returns the next state (or a
//! `Result` for fallible stages), so stages cannot be skipped or run out
//! of order. The grayscale and smoothed images are dropped once edges
//! are extracted; the edge map is kept for the `edge.png` artifact.

use rand::Rng;
use serde::Serialize;

use crate::heatmap::{EdgeAnalysis, HeatmapGrid, Hotspot};
use crate::raster::Mask;
use crate::record::{ShapeCorners, ValidationRecord};
use crate::shape::ShapeParams;
use crate::types::{
    ChallengeConfig, Dimensions, GrayImage, PipelineError, Polygon, Region, RgbaImage,
};

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct Challenge {
    /// Source image dimensions; every image and the mask share them.
    pub dimensions: Dimensions,
    /// Source image as decoded.
    pub original: RgbaImage,
    /// Binary edge map (255 = edge).
    pub edges: GrayImage,
    /// Edge-pixel counts per block.
    pub heatmap: HeatmapGrid,
    /// The busiest block.
    pub hotspot: Hotspot,
    /// Region the shape was drawn for.
    pub region: Region,
    /// Superformula parameters drawn for this run.
    pub params: ShapeParams,
    /// Generated outline, 361 vertices.
    pub polygon: Polygon,
    /// Pixels inside the outline.
    pub mask: Mask,
    /// Source with the outline drawn over it.
    pub outline: RgbaImage,
    /// Shape interior, transparent elsewhere.
    pub interior: RgbaImage,
    /// Source with the shape interior painted white.
    pub white_fill: RgbaImage,
    /// Extreme vertices the record's size comes from.
    pub corners: ShapeCorners,
    /// Ground truth for validating attempts.
    pub record: ValidationRecord,
}

/// Compact, serializable description of a generated challenge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeSummary<'a> {
    /// The stored record.
    pub record: &'a ValidationRecord,
    /// Selected region.
    pub region: Region,
    /// Selected heatmap cell.
    pub hotspot: Hotspot,
    /// Superformula parameters.
    pub params: ShapeParams,
    /// Pixels inside the mask.
    pub covered_pixels: usize,
}

impl Challenge {
    /// Borrow the parts worth printing or logging.
    #[must_use]
    pub fn summary(&self) -> ChallengeSummary<'_> {
        ChallengeSummary {
            record: &self.record,
            region: self.region,
            hotspot: self.hotspot,
            params: self.params,
            covered_pixels: self.mask.count(),
        }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing: call .decode() to continue"]
pub struct Pending {
    config: ChallengeConfig,
    image_id: String,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// The identifier the record will be stored under.
    #[must_use]
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Validate the configuration, decode the source, and reject images
    /// too small for the heatmap grid.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a bad configuration,
    /// [`PipelineError::EmptyInput`] or [`PipelineError::ImageDecode`]
    /// for unreadable bytes, and [`PipelineError::InvalidRegion`] for an
    /// undersized image.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;
        let original = crate::grayscale::decode(&self.source)?;
        let (width, height) = original.dimensions();
        let dimensions = Dimensions { width, height };
        crate::heatmap::check_dimensions(dimensions, &self.config)?;
        Ok(Decoded {
            config: self.config,
            image_id: self.image_id,
            original,
            source_len: self.source.len(),
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
#[must_use = "pipeline stages are consumed by advancing: call .analyze() to continue"]
pub struct Decoded {
    config: ChallengeConfig,
    image_id: String,
    original: RgbaImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.original.dimensions();
        Dimensions { width, height }
    }

    /// Size of the encoded source, in bytes.
    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source_len
    }

    /// Convert to grayscale.
    pub fn grayscale(self) -> Grayscaled {
        let gray = crate::grayscale::to_grayscale(&self.original);
        Grayscaled {
            config: self.config,
            image_id: self.image_id,
            original: self.original,
            gray,
        }
    }

    /// Run grayscale, blur, edge detection, and region selection.
    ///
    /// # Errors
    ///
    /// Same as [`EdgesDetected::select_region`].
    pub fn analyze(self) -> Result<Analyzed, PipelineError> {
        self.grayscale().blur().detect_edges().select_region()
    }
}

// ───────────────────────── Stage 2: Grayscaled ───────────────────────

/// Pipeline state after grayscale conversion.
#[must_use = "pipeline stages are consumed by advancing: call .blur() to continue"]
pub struct Grayscaled {
    config: ChallengeConfig,
    image_id: String,
    original: RgbaImage,
    gray: GrayImage,
}

impl Grayscaled {
    #[must_use]
    pub const fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Smooth the grayscale image, or pass it through unchanged when
    /// `apply_blur` is off.
    pub fn blur(self) -> Blurred {
        let blurred = crate::heatmap::smooth(&self.gray, &self.config);
        let applied = blurred.is_some();
        let smoothed = blurred.unwrap_or(self.gray);
        Blurred {
            config: self.config,
            image_id: self.image_id,
            original: self.original,
            smoothed,
            applied,
        }
    }
}

// ───────────────────────── Stage 3: Blurred ──────────────────────────

/// Pipeline state after the optional smoothing pass.
#[must_use = "pipeline stages are consumed by advancing: call .detect_edges() to continue"]
pub struct Blurred {
    config: ChallengeConfig,
    image_id: String,
    original: RgbaImage,
    smoothed: GrayImage,
    applied: bool,
}

impl Blurred {
    /// The image edges are extracted from.
    #[must_use]
    pub const fn smoothed(&self) -> &GrayImage {
        &self.smoothed
    }

    /// Whether the blur actually ran.
    #[must_use]
    pub const fn applied(&self) -> bool {
        self.applied
    }

    /// Extract the binary edge map.
    pub fn detect_edges(self) -> EdgesDetected {
        let edges = crate::heatmap::detect_edges(&self.smoothed, &self.config);
        EdgesDetected {
            config: self.config,
            image_id: self.image_id,
            original: self.original,
            edges,
        }
    }
}

// ───────────────────────── Stage 4: EdgesDetected ────────────────────

/// Pipeline state after edge detection.
#[must_use = "pipeline stages are consumed by advancing: call .select_region() to continue"]
pub struct EdgesDetected {
    config: ChallengeConfig,
    image_id: String,
    original: RgbaImage,
    edges: GrayImage,
}

impl EdgesDetected {
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Build the heatmap and pick the densest cell.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRegion`] when the grid would have
    /// zero-sized blocks.
    pub fn select_region(self) -> Result<Analyzed, PipelineError> {
        let (heatmap, hotspot, region) =
            crate::heatmap::select_region(&self.edges, &self.config)?;
        tracing::info!(
            image_id = %self.image_id,
            row = hotspot.row,
            col = hotspot.col,
            max_heat = hotspot.count,
            x = region.x,
            y = region.y,
            "selected target region",
        );
        Ok(Analyzed {
            config: self.config,
            image_id: self.image_id,
            original: self.original,
            analysis: EdgeAnalysis {
                edges: self.edges,
                heatmap,
                hotspot,
                region,
            },
        })
    }
}

// ───────────────────────── Stage 5: Analyzed ─────────────────────────

/// Pipeline state after region selection.
#[must_use = "pipeline stages are consumed by advancing: call .generate_shape() to continue"]
pub struct Analyzed {
    config: ChallengeConfig,
    image_id: String,
    original: RgbaImage,
    analysis: EdgeAnalysis,
}

impl Analyzed {
    #[must_use]
    pub const fn analysis(&self) -> &EdgeAnalysis {
        &self.analysis
    }

    #[must_use]
    pub const fn region(&self) -> Region {
        self.analysis.region
    }

    /// Draw a superformula outline for the configured placement mode.
    pub fn generate_shape<R: Rng + ?Sized>(self, rng: &mut R) -> Shaped {
        let (width, height) = self.original.dimensions();
        let (params, polygon) = crate::shape::generate(
            rng,
            &self.config,
            self.analysis.region,
            Dimensions { width, height },
        );
        tracing::info!(
            image_id = %self.image_id,
            points = polygon.len(),
            m = params.m,
            placement = ?self.config.placement,
            "generated shape",
        );
        Shaped {
            config: self.config,
            image_id: self.image_id,
            original: self.original,
            analysis: self.analysis,
            params,
            polygon,
        }
    }
}

// ───────────────────────── Stage 6: Shaped ───────────────────────────

/// Pipeline state after shape generation.
#[must_use = "pipeline stages are consumed by advancing: call .rasterize() to continue"]
pub struct Shaped {
    config: ChallengeConfig,
    image_id: String,
    original: RgbaImage,
    analysis: EdgeAnalysis,
    params: ShapeParams,
    polygon: Polygon,
}

impl Shaped {
    #[must_use]
    pub const fn params(&self) -> &ShapeParams {
        &self.params
    }

    #[must_use]
    pub const fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Fill the outline into a mask over the source image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DegenerateShape`] for fewer than three
    /// vertices.
    pub fn rasterize(self) -> Result<Rasterized, PipelineError> {
        let (width, height) = self.original.dimensions();
        let mask = crate::raster::rasterize(
            &self.polygon,
            Dimensions { width, height },
            self.config.horizontal_edges,
        )?;
        tracing::debug!(covered = mask.count(), "rasterized shape");
        Ok(Rasterized {
            config: self.config,
            image_id: self.image_id,
            original: self.original,
            analysis: self.analysis,
            params: self.params,
            polygon: self.polygon,
            mask,
        })
    }
}

// ───────────────────────── Stage 7: Rasterized ───────────────────────

/// Pipeline state after rasterization.
#[must_use = "pipeline stages are consumed by advancing: call .composite() to continue"]
pub struct Rasterized {
    config: ChallengeConfig,
    image_id: String,
    original: RgbaImage,
    analysis: EdgeAnalysis,
    params: ShapeParams,
    polygon: Polygon,
    mask: Mask,
}

impl Rasterized {
    #[must_use]
    pub const fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Render the three derived images and build the validation record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DegenerateShape`] for fewer than three
    /// vertices and [`PipelineError::DimensionMismatch`] if the mask does
    /// not match the source.
    pub fn composite(self) -> Result<Composited, PipelineError> {
        let outline = crate::composite::outline_debug(&self.original, &self.polygon)?;
        let interior = crate::composite::extract_interior(&self.original, &self.mask)?;
        let white_fill = crate::composite::fill_interior_white(&self.original, &self.mask)?;

        let corners =
            crate::record::find_corners(&self.polygon).ok_or(PipelineError::DegenerateShape {
                points: self.polygon.len(),
            })?;
        let record = ValidationRecord::new(
            self.image_id,
            self.analysis.region,
            &corners,
            self.config.tolerance,
        );
        tracing::info!(
            image_id = %record.image_id,
            valid_x = record.valid_x,
            valid_y = record.valid_y,
            shape_width = record.shape_width,
            shape_height = record.shape_height,
            "built validation record",
        );

        let (width, height) = self.original.dimensions();
        Ok(Composited {
            challenge: Challenge {
                dimensions: Dimensions { width, height },
                original: self.original,
                edges: self.analysis.edges,
                heatmap: self.analysis.heatmap,
                hotspot: self.analysis.hotspot,
                region: self.analysis.region,
                params: self.params,
                polygon: self.polygon,
                mask: self.mask,
                outline,
                interior,
                white_fill,
                corners,
                record,
            },
        })
    }
}

// ───────────────────────── Stage 8: Composited ───────────────────────

/// Final pipeline state: every output exists.
#[must_use = "call .into_challenge() to extract the Challenge"]
pub struct Composited {
    challenge: Challenge,
}

impl Composited {
    #[must_use]
    pub const fn record(&self) -> &ValidationRecord {
        &self.challenge.record
    }

    #[must_use]
    pub fn into_challenge(self) -> Challenge {
        self.challenge
    }
}

/// Entry point for the incremental pipeline.
///
/// Call [`Pipeline::new`] to get a [`Pending`] stage and chain stage
/// methods from there.
pub struct Pipeline;

impl Pipeline {
    /// Store the source bytes, image id, and config. Nothing is decoded
    /// until [`.decode()`](Pending::decode).
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        image_bytes: Vec<u8>,
        image_id: impl Into<String>,
        config: ChallengeConfig,
    ) -> Pending {
        Pending {
            config,
            image_id: image_id.into(),
            source: image_bytes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::composite::{TRANSPARENT, WHITE};
    use crate::shape::VERTEX_COUNT;
    use crate::types::PlacementMode;

    /// 100x100 black PNG with yellow vertical stripes in grid cell (2, 3).
    ///
    /// No pixel is pure white, so white in the filled image always means
    /// the mask covered it.
    fn striped_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(100, 100, |x, y| {
            let in_cell = (60..80).contains(&x) && (40..60).contains(&y);
            if in_cell && ((x - 60) / 4) % 2 == 0 {
                image::Rgba([250, 240, 30, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn no_blur() -> ChallengeConfig {
        ChallengeConfig {
            apply_blur: false,
            ..ChallengeConfig::default()
        }
    }

    #[test]
    fn pending_exposes_source_and_id() {
        let png = striped_png();
        let len = png.len();
        let pending = Pipeline::new(png, "stripes", ChallengeConfig::default());
        assert_eq!(pending.source().len(), len);
        assert_eq!(pending.image_id(), "stripes");
    }

    #[test]
    fn decode_empty_input_returns_error() {
        let result = Pipeline::new(vec![], "x", ChallengeConfig::default()).decode();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn decode_corrupt_input_returns_error() {
        let result = Pipeline::new(vec![0xFF, 0x00], "x", ChallengeConfig::default()).decode();
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn decode_rejects_invalid_config_before_decoding() {
        let config = ChallengeConfig {
            grid_rows: 0,
            ..ChallengeConfig::default()
        };
        let result = Pipeline::new(vec![], "x", config).decode();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn decode_rejects_images_smaller_than_the_minimum() {
        let config = ChallengeConfig {
            min_image_side: 200,
            ..ChallengeConfig::default()
        };
        let result = Pipeline::new(striped_png(), "x", config).decode();
        assert!(matches!(result, Err(PipelineError::InvalidRegion { .. })));
    }

    #[test]
    fn blur_stage_respects_apply_blur() {
        let decoded = Pipeline::new(striped_png(), "x", no_blur()).decode().unwrap();
        let blurred = decoded.grayscale().blur();
        assert!(!blurred.applied());

        let decoded = Pipeline::new(striped_png(), "x", ChallengeConfig::default())
            .decode()
            .unwrap();
        let gray = decoded.grayscale();
        let before = gray.gray().clone();
        let blurred = gray.blur();
        assert!(blurred.applied());
        assert_ne!(blurred.smoothed(), &before);
    }

    #[test]
    fn stepwise_and_shorthand_analysis_agree() {
        let stepwise = Pipeline::new(striped_png(), "x", no_blur())
            .decode()
            .unwrap()
            .grayscale()
            .blur()
            .detect_edges()
            .select_region()
            .unwrap();
        let shorthand = Pipeline::new(striped_png(), "x", no_blur())
            .decode()
            .unwrap()
            .analyze()
            .unwrap();
        assert_eq!(stepwise.region(), shorthand.region());
        assert_eq!(stepwise.region(), Region::new(60, 40, 20, 20));
    }

    #[test]
    fn stage_chain_matches_one_shot_analysis() {
        for config in [ChallengeConfig::default(), no_blur()] {
            let decoded = Pipeline::new(striped_png(), "x", config.clone())
                .decode()
                .unwrap();
            let one_shot = crate::heatmap::analyze(decoded.original(), &config).unwrap();
            let analyzed = decoded.analyze().unwrap();
            assert_eq!(analyzed.analysis(), &one_shot);
        }
    }

    #[test]
    fn full_chain_produces_consistent_challenge() {
        let mut rng = StdRng::seed_from_u64(5);
        let challenge = Pipeline::new(striped_png(), "stripes", no_blur())
            .decode()
            .unwrap()
            .analyze()
            .unwrap()
            .generate_shape(&mut rng)
            .rasterize()
            .unwrap()
            .composite()
            .unwrap()
            .into_challenge();

        assert_eq!(challenge.polygon.len(), VERTEX_COUNT);
        assert!(!challenge.mask.is_empty());
        assert_eq!(challenge.record.image_id, "stripes");
        assert_eq!((challenge.record.valid_x, challenge.record.valid_y), (60, 40));
        assert_eq!(challenge.record.tolerance, 10);
        assert_eq!(challenge.record.shape_width, challenge.corners.width());
        assert_eq!(challenge.edges.dimensions(), (100, 100));

        for (x, y, px) in challenge.interior.enumerate_pixels() {
            let inside = challenge.mask.contains(x, y);
            assert_eq!(*px != TRANSPARENT, inside);
            let filled = challenge.white_fill.get_pixel(x, y);
            assert_eq!(*filled == WHITE, inside);
            if !inside {
                assert_eq!(filled, challenge.original.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn full_image_mode_keeps_region_origin_in_record() {
        let config = ChallengeConfig {
            placement: PlacementMode::FullImage,
            ..no_blur()
        };
        let mut rng = StdRng::seed_from_u64(8);
        let shaped = Pipeline::new(striped_png(), "x", config)
            .decode()
            .unwrap()
            .analyze()
            .unwrap()
            .generate_shape(&mut rng);
        // Centered on the image, not the region.
        let xs: Vec<i32> = shaped.polygon().points().iter().map(|p| p.x).collect();
        assert!(xs.iter().any(|&x| x > 50) && xs.iter().any(|&x| x < 50));

        let record = shaped.rasterize().unwrap().composite().unwrap().into_challenge().record;
        assert_eq!((record.valid_x, record.valid_y), (60, 40));
    }

    #[test]
    fn summary_reports_covered_pixels() {
        let mut rng = StdRng::seed_from_u64(1);
        let challenge = Pipeline::new(striped_png(), "s", no_blur())
            .decode()
            .unwrap()
            .analyze()
            .unwrap()
            .generate_shape(&mut rng)
            .rasterize()
            .unwrap()
            .composite()
            .unwrap()
            .into_challenge();
        let summary = challenge.summary();
        assert_eq!(summary.covered_pixels, challenge.mask.count());
        assert_eq!(summary.record, &challenge.record);
    }
}
