//! Procedural shape generation with the superformula.
//!
//! ```text
//! r(phi) = ( |cos(m*phi/4) / a|^n2 + |sin(m*phi/4) / b|^n3 ) ^ (-1/n1)
//! ```
//!
//! The curve is sampled once per integer degree from 0 to 360 inclusive,
//! giving [`VERTEX_COUNT`] vertices where the last one sits on the seam
//! and coincides with the first. Vertex coordinates are truncated toward
//! zero, never rounded.
//!
//! Extreme parameter draws can produce self-intersecting outlines. They
//! are kept as-is; the rasterizer fills them with the even-odd rule.

use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{ChallengeConfig, Dimensions, PixelPoint, PlacementMode, Polygon, Region};

/// Vertices in every generated polygon: one per degree in `0..=360`.
pub const VERTEX_COUNT: usize = 361;

/// One draw of superformula parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeParams {
    /// Cosine-term divisor, in `[0.6, 1.1)`.
    pub a: f64,
    /// Sine-term divisor, in `[0.6, 1.1)`.
    pub b: f64,
    /// Rotational symmetry, an integer in `[3, 12]`.
    pub m: u32,
    /// Overall exponent, in `[1.0, 4.0)`.
    pub n1: f64,
    /// Cosine-term exponent, in `[1.0, 4.0)`.
    pub n2: f64,
    /// Sine-term exponent, in `[1.0, 4.0)`.
    pub n3: f64,
}

impl ShapeParams {
    /// Draw every parameter uniformly from its range.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            a: rng.random_range(0.6..1.1),
            b: rng.random_range(0.6..1.1),
            m: rng.random_range(3..=12),
            n1: rng.random_range(1.0..4.0),
            n2: rng.random_range(1.0..4.0),
            n3: rng.random_range(1.0..4.0),
        }
    }

    /// Radius of the curve at angle `phi` (radians).
    #[must_use]
    pub fn radius(&self, phi: f64) -> f64 {
        let theta = f64::from(self.m) * phi / 4.0;
        let t1 = (theta.cos() / self.a).abs().powf(self.n2);
        let t2 = (theta.sin() / self.b).abs().powf(self.n3);
        (t1 + t2).powf(-1.0 / self.n1)
    }
}

/// Where a polygon is centered and how large it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Center x in pixels.
    pub cx: f64,
    /// Center y in pixels.
    pub cy: f64,
    /// Multiplier applied to the superformula radius.
    pub scale: f64,
}

impl Placement {
    /// Center on `region`, scaled by `factor * min(region.width, region.height)`.
    #[must_use]
    pub fn in_region(region: Region, factor: f64) -> Self {
        let (cx, cy) = region.center();
        Self {
            cx,
            cy,
            scale: f64::from(region.min_side()) * factor,
        }
    }

    /// Placement for the configured mode.
    ///
    /// [`PlacementMode::RegionConstrained`] uses the selected region;
    /// [`PlacementMode::FullImage`] ignores it and uses the whole image.
    #[must_use]
    pub fn for_mode(config: &ChallengeConfig, region: Region, dimensions: Dimensions) -> Self {
        match config.placement {
            PlacementMode::RegionConstrained => Self::in_region(region, config.region_scale),
            PlacementMode::FullImage => {
                Self::in_region(Region::full(dimensions), config.full_image_scale)
            }
        }
    }
}

/// Trace the superformula into a closed integer polygon.
///
/// Vertex `i` lies at angle `i` degrees. The seam vertex (`i = 360`) is
/// evaluated at the same angle as vertex 0, so the two are identical.
#[must_use = "returns the generated polygon"]
#[allow(clippy::cast_possible_truncation, clippy::suboptimal_flops)]
pub fn trace(params: &ShapeParams, placement: Placement) -> Polygon {
    let points = (0..=360_u32)
        .map(|i| {
            let phi = f64::from(i % 360) * PI / 180.0;
            let r = params.radius(phi) * placement.scale;
            // Must stay unfused; mul_add shifts some vertices by a pixel.
            PixelPoint::new(
                (placement.cx + r * phi.cos()) as i32,
                (placement.cy + r * phi.sin()) as i32,
            )
        })
        .collect();
    Polygon::new(points)
}

/// Draw fresh parameters and trace a polygon for the configured mode.
///
/// Returns the parameters alongside the polygon so callers can record
/// how a challenge was drawn.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    config: &ChallengeConfig,
    region: Region,
    dimensions: Dimensions,
) -> (ShapeParams, Polygon) {
    let params = ShapeParams::sample(rng);
    let placement = Placement::for_mode(config, region, dimensions);
    let polygon = trace(&params, placement);
    tracing::debug!(?params, ?placement, "traced superformula outline");
    (params, polygon)
}
