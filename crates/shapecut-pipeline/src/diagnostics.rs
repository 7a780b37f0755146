//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`generate_challenge_with_diagnostics`] drives the incremental
//! [`Pipeline`] one stage at a time and records how long each stage
//! took and what it produced. Timestamps come from a caller-supplied
//! [`Clock`], keeping this crate free of platform time sources.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pipeline::{Challenge, Pipeline};
use crate::shape::ShapeParams;
use crate::types::{BlurBorder, ChallengeConfig, PipelineError, PlacementMode, Region};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
///
/// The blur stage is `None` when `apply_blur` is off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Decoding the source bytes.
    pub decode: StageDiagnostics,
    /// Luma conversion.
    pub grayscale: StageDiagnostics,
    /// Gaussian smoothing, if enabled.
    pub blur: Option<StageDiagnostics>,
    /// Canny edge extraction.
    pub edge_detection: StageDiagnostics,
    /// Heatmap accumulation and region selection.
    pub heatmap: StageDiagnostics,
    /// Superformula sampling and tracing.
    pub shape: StageDiagnostics,
    /// Scan-line fill of the outline.
    pub rasterize: StageDiagnostics,
    /// Compositing plus record construction.
    pub composite: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Run-level summary.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding.
    Decode {
        /// Size of the encoded input.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// `width * height`.
        pixel_count: u64,
    },
    /// Grayscale conversion.
    Grayscale {
        /// Output width in pixels.
        width: u32,
        /// Output height in pixels.
        height: u32,
    },
    /// Gaussian blur.
    Blur {
        /// Kernel radius in pixels.
        radius: u32,
        /// Kernel sigma.
        sigma: f32,
        /// Border policy used.
        border: BlurBorder,
    },
    /// Canny edge detection.
    EdgeDetection {
        /// Hysteresis low threshold.
        low_threshold: f32,
        /// Hysteresis high threshold.
        high_threshold: f32,
        /// Pixels strictly above the edge cut-off.
        edge_pixel_count: u64,
        /// Pixels in the image.
        total_pixel_count: u64,
    },
    /// Heatmap and region selection.
    Heatmap {
        /// Grid rows.
        rows: u32,
        /// Grid columns.
        cols: u32,
        /// Block width in pixels.
        block_width: u32,
        /// Block height in pixels.
        block_height: u32,
        /// Edge pixels counted inside grid blocks.
        counted: u64,
        /// Count in the selected block.
        max_count: u64,
        /// Selected row.
        row: u32,
        /// Selected column.
        col: u32,
    },
    /// Shape generation.
    Shape {
        /// Placement mode used.
        placement: PlacementMode,
        /// The drawn superformula parameters.
        params: ShapeParams,
        /// Vertices in the outline.
        vertex_count: usize,
    },
    /// Mask rasterization.
    Rasterize {
        /// Pixels inside the mask.
        covered_pixels: usize,
        /// `covered_pixels / pixel_count`.
        coverage: f64,
    },
    /// Compositing and record construction.
    Composite {
        /// Recorded shape width.
        shape_width: i32,
        /// Recorded shape height.
        shape_height: i32,
    },
}

/// High-level summary for the entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Identifier the record is stored under.
    pub image_id: String,
    /// Source width in pixels.
    pub image_width: u32,
    /// Source height in pixels.
    pub image_height: u32,
    /// Pixels in the source.
    pub pixel_count: u64,
    /// Selected region.
    pub region: Region,
    /// Pixels inside the mask.
    pub covered_pixels: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {} {}x{} ({} pixels)",
            self.summary.image_id,
            self.summary.image_width,
            self.summary.image_height,
            self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        let r = self.summary.region;
        lines.push(String::new());
        lines.push(format!(
            "Region: {}x{} at ({}, {})  |  Covered pixels: {}",
            r.width, r.height, r.x, r.y, self.summary.covered_pixels,
        ));

        lines.join("\n")
    }

    /// Every stage that ran, in pipeline order.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        let mut stages = vec![("Decode", &self.decode), ("Grayscale", &self.grayscale)];
        if let Some(ref blur) = self.blur {
            stages.push(("Blur", blur));
        }
        stages.extend([
            ("Edge Detection", &self.edge_detection),
            ("Heatmap", &self.heatmap),
            ("Shape", &self.shape),
            ("Rasterize", &self.rasterize),
            ("Composite", &self.composite),
        ]);
        stages
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Grayscale { width, height } => format!("{width}x{height}"),
        StageMetrics::Blur {
            radius,
            sigma,
            border,
        } => format!("r={radius} sigma={sigma:.2} border={border:?}"),
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::Heatmap {
            rows,
            cols,
            block_width,
            block_height,
            counted,
            max_count,
            row,
            col,
        } => format!(
            "{rows}x{cols} of {block_width}x{block_height}, counted={counted} max={max_count} at ({row}, {col})",
        ),
        StageMetrics::Shape {
            placement,
            params,
            vertex_count,
        } => format!(
            "{placement:?} m={} a={:.2} b={:.2} n=({:.2}, {:.2}, {:.2}) {vertex_count} pts",
            params.m, params.a, params.b, params.n1, params.n2, params.n3,
        ),
        StageMetrics::Rasterize {
            covered_pixels,
            coverage,
        } => format!("{covered_pixels} px ({:.2}%)", coverage * 100.0),
        StageMetrics::Composite {
            shape_width,
            shape_height,
        } => format!("shape {shape_width}x{shape_height}"),
    }
}

/// Time one stage and pair its output with the elapsed duration.
fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let out = f();
    (out, clock.elapsed(&start))
}

/// Run the whole pipeline, collecting per-stage diagnostics.
///
/// Produces the same [`Challenge`] as [`crate::generate_challenge`] for
/// the same inputs and random state.
///
/// # Errors
///
/// Same as [`crate::generate_challenge`].
pub fn generate_challenge_with_diagnostics<R, C>(
    image_bytes: &[u8],
    image_id: &str,
    config: &ChallengeConfig,
    rng: &mut R,
    clock: &C,
) -> Result<(Challenge, PipelineDiagnostics), PipelineError>
where
    R: Rng + ?Sized,
    C: Clock,
{
    let total_start = clock.now();
    let pending = Pipeline::new(image_bytes.to_vec(), image_id, config.clone());

    let (decoded, duration) = timed(clock, || pending.decode());
    let decoded = decoded?;
    let dims = decoded.dimensions();
    let decode = StageDiagnostics {
        duration,
        metrics: StageMetrics::Decode {
            input_bytes: decoded.source_len(),
            width: dims.width,
            height: dims.height,
            pixel_count: dims.pixel_count(),
        },
    };

    let (gray, duration) = timed(clock, || decoded.grayscale());
    let grayscale = StageDiagnostics {
        duration,
        metrics: StageMetrics::Grayscale {
            width: dims.width,
            height: dims.height,
        },
    };

    let (blurred, duration) = timed(clock, || gray.blur());
    let blur = blurred.applied().then(|| StageDiagnostics {
        duration,
        metrics: StageMetrics::Blur {
            radius: config.blur_radius,
            sigma: config.blur_sigma,
            border: config.blur_border,
        },
    });

    let (edges, duration) = timed(clock, || blurred.detect_edges());
    let edge_detection = StageDiagnostics {
        duration,
        metrics: StageMetrics::EdgeDetection {
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
            edge_pixel_count: crate::edge::count_edge_pixels(edges.edges(), config.edge_cutoff),
            total_pixel_count: dims.pixel_count(),
        },
    };

    let (analyzed, duration) = timed(clock, || edges.select_region());
    let analyzed = analyzed?;
    let analysis = analyzed.analysis();
    let (block_width, block_height) = analysis.heatmap.block_size();
    let heatmap = StageDiagnostics {
        duration,
        metrics: StageMetrics::Heatmap {
            rows: analysis.heatmap.rows(),
            cols: analysis.heatmap.cols(),
            block_width,
            block_height,
            counted: analysis.heatmap.total(),
            max_count: analysis.hotspot.count,
            row: analysis.hotspot.row,
            col: analysis.hotspot.col,
        },
    };
    let region = analyzed.region();

    let (shaped, duration) = timed(clock, || analyzed.generate_shape(rng));
    let shape = StageDiagnostics {
        duration,
        metrics: StageMetrics::Shape {
            placement: config.placement,
            params: *shaped.params(),
            vertex_count: shaped.polygon().len(),
        },
    };

    let (rasterized, duration) = timed(clock, || shaped.rasterize());
    let rasterized = rasterized?;
    let covered_pixels = rasterized.mask().count();
    #[allow(clippy::cast_precision_loss)]
    let coverage = covered_pixels as f64 / dims.pixel_count() as f64;
    let rasterize = StageDiagnostics {
        duration,
        metrics: StageMetrics::Rasterize {
            covered_pixels,
            coverage,
        },
    };

    let (composited, duration) = timed(clock, || rasterized.composite());
    let composited = composited?;
    let composite = StageDiagnostics {
        duration,
        metrics: StageMetrics::Composite {
            shape_width: composited.record().shape_width,
            shape_height: composited.record().shape_height,
        },
    };

    let total_duration = clock.elapsed(&total_start);
    let diagnostics = PipelineDiagnostics {
        decode,
        grayscale,
        blur,
        edge_detection,
        heatmap,
        shape,
        rasterize,
        composite,
        total_duration,
        summary: PipelineSummary {
            image_id: image_id.to_string(),
            image_width: dims.width,
            image_height: dims.height,
            pixel_count: dims.pixel_count(),
            region,
            covered_pixels,
        },
    };
    Ok((composited.into_challenge(), diagnostics))
}
