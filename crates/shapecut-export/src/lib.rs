//! shapecut-export: Pure artifact serializers (sans-IO)
//!
//! Encodes the four per-challenge images as PNG under their canonical
//! file names. Writing them anywhere is the caller's job.

pub mod png;

pub use png::{encode_gray, encode_rgba};

use shapecut_pipeline::Challenge;

/// Diagnostic edge map.
pub const EDGE_PNG: &str = "edge.png";
/// Shape interior, transparent elsewhere.
pub const SHAPE_EXTRACT_PNG: &str = "shape_extract.png";
/// Source with the shape interior painted white.
pub const WHITE_FILL_PNG: &str = "white_fill.png";
/// Source with the outline drawn over it.
pub const DEBUG_PNG: &str = "debug.png";

/// Errors from artifact encoding.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode PNG: {0}")]
    Png(#[from] image::ImageError),
}

/// One encoded output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name, one of the `*_PNG` constants.
    pub name: &'static str,
    pub bytes: Vec<u8>,
}

/// Encode every artifact of `challenge`, in a fixed order: edge map,
/// cut-out, white fill, debug outline.
///
/// # Errors
///
/// Returns [`ExportError::Png`] if any image fails to encode.
pub fn encode_artifacts(challenge: &Challenge) -> Result<Vec<Artifact>, ExportError> {
    Ok(vec![
        Artifact {
            name: EDGE_PNG,
            bytes: encode_gray(&challenge.edges)?,
        },
        Artifact {
            name: SHAPE_EXTRACT_PNG,
            bytes: encode_rgba(&challenge.interior)?,
        },
        Artifact {
            name: WHITE_FILL_PNG,
            bytes: encode_rgba(&challenge.white_fill)?,
        },
        Artifact {
            name: DEBUG_PNG,
            bytes: encode_rgba(&challenge.outline)?,
        },
    ])
}
