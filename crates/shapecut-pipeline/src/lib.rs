//! shapecut-pipeline: Pure challenge generation pipeline (sans-IO).
//!
//! Turns a photograph into a drag-and-drop shape placement challenge:
//! grayscale -> blur -> edge detection -> edge-density heatmap ->
//! superformula outline -> scan-line mask -> composited images ->
//! validation record.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and returns structured data. PNG encoding lives in
//! `shapecut-export`, record persistence in `shapecut-store`, and all
//! filesystem interaction in the `shapecut` binary.

pub mod blur;
pub mod canny;
pub mod composite;
pub mod diagnostics;
pub mod edge;
pub mod grayscale;
pub mod heatmap;
pub mod pipeline;
pub mod raster;
pub mod record;
pub mod shape;
pub mod types;

use rand::Rng;

pub use diagnostics::{Clock, PipelineDiagnostics, generate_challenge_with_diagnostics};
pub use heatmap::{EdgeAnalysis, HeatmapGrid, Hotspot};
pub use pipeline::{Challenge, ChallengeSummary, Pipeline};
pub use raster::Mask;
pub use record::{
    Attempt, AttemptOutcome, ChallengeLinks, ShapeCorners, ValidationRecord, find_corners,
    validate,
};
pub use shape::{Placement, ShapeParams};
pub use types::{
    BlurBorder, ChallengeConfig, Dimensions, HorizontalEdges, PipelineError, PixelPoint,
    PlacementMode, Polygon, Region,
};

/// Run the full challenge pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP), the identifier the
/// record is stored under, a configuration, and a random source for the
/// shape parameters.
///
/// # Pipeline steps
///
/// 1. Validate the config, decode, and reject undersized images
/// 2. Grayscale conversion
/// 3. Optional Gaussian blur
/// 4. Canny edge detection
/// 5. Edge-density heatmap and region selection
/// 6. Superformula outline for the configured placement mode
/// 7. Scan-line rasterization into a mask
/// 8. Outline, cut-out, and white-fill compositing
/// 9. Corner extraction and validation record
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a bad configuration,
/// [`PipelineError::EmptyInput`] or [`PipelineError::ImageDecode`] for
/// unreadable input, [`PipelineError::InvalidRegion`] for an image too
/// small for the heatmap grid, and [`PipelineError::DegenerateShape`] if
/// the outline cannot enclose any area.
pub fn generate_challenge<R: Rng + ?Sized>(
    image_bytes: &[u8],
    image_id: &str,
    config: &ChallengeConfig,
    rng: &mut R,
) -> Result<Challenge, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), image_id, config.clone())
        .decode()?
        .analyze()?
        .generate_shape(rng)
        .rasterize()?
        .composite()?
        .into_challenge())
}
