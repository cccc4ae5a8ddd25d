//! Target-specific detection: pick the largest lit blob and label its four
//! pose corners.

mod corners;
mod selector;

pub use corners::{check_upright, CornerDetection, CornerFinder, CornerParams, CornerSet};
pub use selector::{select_largest, Candidate};

/// Reasons a contour does not yield a usable corner set.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CornerError {
    #[error("contour has {0} points, at least 3 are needed")]
    TooFewPoints(usize),
    #[error("polygon has {vertices} vertices, expected {min}..={max}")]
    VertexCount {
        vertices: usize,
        min: usize,
        max: usize,
    },
    #[error("contour encloses no area")]
    DegenerateMoments,
    #[error("inconsistent corner orientation: {0}")]
    InconsistentOrientation(&'static str),
    #[error("invalid corner parameters: {0}")]
    InvalidParams(String),
}
