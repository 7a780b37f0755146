//! Ground-truth records and attempt checking.
//!
//! A [`ValidationRecord`] is built once per challenge from the selected
//! region and the generated outline, then persisted by the caller.
//! [`validate`] compares a submitted placement against it.

use serde::{Deserialize, Serialize};

use crate::types::{PixelPoint, Polygon, Region};

/// Default public path the serving layer exposes artifacts under.
pub const DEFAULT_ASSET_ROOT: &str = "/assets/prod";

/// Four extreme vertices of an outline.
///
/// Found by a single scan in vertex order where each candidate replaces
/// the current best when it is at least as extreme on *both* axes. The
/// result depends on vertex order and is not always the geometric
/// bounding box; shapes with slanted sides can report a zero or shrunken
/// extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeCorners {
    /// Last vertex at least as far left and up as the running best.
    pub top_left: PixelPoint,
    /// Last vertex at least as far right and up as the running best.
    pub top_right: PixelPoint,
    /// Last vertex at least as far left and down as the running best.
    pub bottom_left: PixelPoint,
    /// Last vertex at least as far right and down as the running best.
    pub bottom_right: PixelPoint,
}

impl ShapeCorners {
    /// `top_right.x - top_left.x`.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.top_right.x - self.top_left.x
    }

    /// `bottom_left.y - top_left.y`.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.bottom_left.y - self.top_left.y
    }
}

/// Scan `polygon` once for its four corners, or `None` when it has no
/// vertices.
#[must_use]
pub fn find_corners(polygon: &Polygon) -> Option<ShapeCorners> {
    let first = *polygon.points().first()?;
    let mut corners = ShapeCorners {
        top_left: first,
        top_right: first,
        bottom_left: first,
        bottom_right: first,
    };
    for &p in polygon.points() {
        if p.x <= corners.top_left.x && p.y <= corners.top_left.y {
            corners.top_left = p;
        }
        if p.x >= corners.top_right.x && p.y <= corners.top_right.y {
            corners.top_right = p;
        }
        if p.x <= corners.bottom_left.x && p.y >= corners.bottom_left.y {
            corners.bottom_left = p;
        }
        if p.x >= corners.bottom_right.x && p.y >= corners.bottom_right.y {
            corners.bottom_right = p;
        }
    }
    Some(corners)
}

/// Stored ground truth for one challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Opaque image identifier, unique per store.
    pub image_id: String,
    /// Expected x offset: the analyzed region's left edge.
    pub valid_x: i64,
    /// Expected y offset: the analyzed region's top edge.
    pub valid_y: i64,
    /// Allowed per-axis deviation in pixels.
    pub tolerance: u32,
    /// [`ShapeCorners::width`] of the outline.
    pub shape_width: i32,
    /// [`ShapeCorners::height`] of the outline.
    pub shape_height: i32,
}

impl ValidationRecord {
    /// Build a record from the region origin and the outline's corners.
    #[must_use]
    pub fn new(
        image_id: impl Into<String>,
        region: Region,
        corners: &ShapeCorners,
        tolerance: u32,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            valid_x: i64::from(region.x),
            valid_y: i64::from(region.y),
            tolerance,
            shape_width: corners.width(),
            shape_height: corners.height(),
        }
    }
}

/// Whether `(x, y)` is within `record.tolerance` of the expected offset
/// on each axis independently. Never fails.
#[must_use]
pub fn validate(record: &ValidationRecord, x: i64, y: i64) -> bool {
    let tolerance = u64::from(record.tolerance);
    record.valid_x.abs_diff(x) <= tolerance && record.valid_y.abs_diff(y) <= tolerance
}

/// A submitted placement. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Challenge the placement is for.
    #[serde(rename = "imageId", alias = "image_id")]
    pub image_id: String,
    /// Submitted x offset.
    pub x: i64,
    /// Submitted y offset.
    pub y: i64,
}

/// Response to an [`Attempt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    /// Whether the placement was within tolerance.
    pub success: bool,
    /// [`Self::CORRECT`] or [`Self::TRY_AGAIN`].
    pub message: String,
}

impl AttemptOutcome {
    /// Message for an accepted placement.
    pub const CORRECT: &str = "Correct!";
    /// Message for a rejected placement.
    pub const TRY_AGAIN: &str = "Try again";

    /// Check `attempt` against `record`.
    #[must_use]
    pub fn judge(record: &ValidationRecord, attempt: &Attempt) -> Self {
        let success = validate(record, attempt.x, attempt.y);
        let message = if success { Self::CORRECT } else { Self::TRY_AGAIN };
        Self {
            success,
            message: message.to_string(),
        }
    }
}

/// Public URLs of the two images a client needs to render a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeLinks {
    /// Challenge identifier.
    pub image_id: String,
    /// The white-filled background image.
    pub main_image: String,
    /// The transparent cut-out piece.
    pub cutout_image: String,
}

impl ChallengeLinks {
    /// Links for `image_id` under `asset_root`.
    #[must_use]
    pub fn new(asset_root: &str, image_id: &str) -> Self {
        let root = asset_root.trim_end_matches('/');
        Self {
            image_id: image_id.to_string(),
            main_image: format!("{root}/{image_id}/white_fill.png"),
            cutout_image: format!("{root}/{image_id}/shape_extract.png"),
        }
    }
}
