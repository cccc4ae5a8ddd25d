use portvision_core::ImageError;
use portvision_pose::PoseError;
use portvision_target::CornerError;

/// Why a frame produced no measurement, or why a pipeline could not be built.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("no contours in the thresholded frame")]
    NoContours,
    #[error(transparent)]
    Corner(#[from] CornerError),
    #[error(transparent)]
    Pose(#[from] PoseError),
    #[error("invalid pipeline parameters: {0}")]
    InvalidParams(String),
}

/// Coarse bucket for a dropped frame, used for counters and log levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropCategory {
    InvalidInput,
    NoTarget,
    SolverFailure,
    Internal,
}

impl PipelineError {
    /// Nothing target-shaped was found in the frame.
    pub fn is_no_target(&self) -> bool {
        match self {
            PipelineError::NoContours => true,
            PipelineError::Corner(err) => !matches!(err, CornerError::InvalidParams(_)),
            _ => false,
        }
    }

    /// Corners were found but no acceptable pose fits them.
    pub fn is_solver_failure(&self) -> bool {
        match self {
            PipelineError::Pose(err) => !err.is_internal() && !err.is_config(),
            _ => false,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, PipelineError::Pose(err) if err.is_internal())
    }

    pub fn category(&self) -> DropCategory {
        if self.is_no_target() {
            DropCategory::NoTarget
        } else if self.is_solver_failure() {
            DropCategory::SolverFailure
        } else if self.is_internal() {
            DropCategory::Internal
        } else {
            DropCategory::InvalidInput
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(PipelineError::NoContours.category(), DropCategory::NoTarget);
        assert_eq!(
            PipelineError::from(CornerError::VertexCount {
                vertices: 3,
                min: 7,
                max: 8
            })
            .category(),
            DropCategory::NoTarget
        );
        assert_eq!(
            PipelineError::from(PoseError::BehindCamera { tz: -1.0 }).category(),
            DropCategory::SolverFailure
        );
        assert_eq!(
            PipelineError::from(PoseError::NotOrthonormal { deviation: 0.1 }).category(),
            DropCategory::Internal
        );
        assert_eq!(
            PipelineError::from(ImageError::InvalidDimensions {
                width: 0,
                height: 0
            })
            .category(),
            DropCategory::InvalidInput
        );
    }
}
