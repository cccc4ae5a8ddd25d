//! Camera geometry for the vision target: calibrated projection, the
//! target's physical outline, four-point pose and Euler decomposition.

mod camera;
mod homography;
mod orientation;
mod pnp;
mod target;

pub use camera::{BrownConrady5, CameraModel};
pub use homography::Homography;
pub use orientation::{
    depth_distance, is_rotation_matrix, orthonormality_error, planar_distance, rodrigues,
    rotation_vector, skew, Orientation, ORTHONORMAL_TOLERANCE, SINGULAR_THRESHOLD,
};
pub use pnp::{Pose, PoseEstimator, SolverParams};
pub use target::TargetGeometry;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("image corner is not finite")]
    NonFinite,
    #[error("degenerate correspondences: {0}")]
    Degenerate(&'static str),
    #[error("solution places the target behind the camera (t_z = {tz})")]
    BehindCamera { tz: f64 },
    #[error("solver did not converge (rms {rms:.3} px, limit {max:.3} px)")]
    NotConverged { rms: f64, max: f64 },
    #[error("rotation matrix is not orthonormal (|R*R^T - I| = {deviation:e})")]
    NotOrthonormal { deviation: f64 },
    #[error("invalid camera model: {0}")]
    InvalidCamera(String),
    #[error("invalid target geometry: {0}")]
    InvalidTarget(String),
}

impl PoseError {
    /// Numeric corruption that a well-formed input can never produce.
    pub fn is_internal(&self) -> bool {
        matches!(self, PoseError::NotOrthonormal { .. })
    }

    /// Configuration problems caught before any frame is processed.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PoseError::InvalidCamera(_) | PoseError::InvalidTarget(_)
        )
    }
}
