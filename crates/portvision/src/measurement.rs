use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use portvision_pose::{depth_distance, planar_distance, Orientation, Pose};
use portvision_target::CornerSet;

use crate::PipelineError;

/// Everything published for one successfully processed frame.
///
/// Distances are in meters and angles in radians.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetMeasurement {
    pub pose: Pose,
    pub orientation: Orientation,
    /// Depth along the optical axis, `t_z`.
    pub distance: f64,
    /// Offset in the image plane, `sqrt(t_x^2 + t_y^2)`.
    pub plane_distance: f64,
    /// Straight-line distance `|t|`.
    pub range: f64,
    /// Contour centroid in absolute pixel coordinates.
    pub centroid: Point2<f64>,
    pub corners: CornerSet,
    pub contour_area: f64,
}

impl TargetMeasurement {
    pub(crate) fn new(
        pose: Pose,
        orientation: Orientation,
        corners: CornerSet,
        contour_area: f64,
    ) -> Self {
        Self {
            distance: depth_distance(&pose.tvec),
            plane_distance: planar_distance(&pose.tvec),
            range: pose.tvec.norm(),
            centroid: corners.centroid,
            pose,
            orientation,
            corners,
            contour_area,
        }
    }

    pub fn reprojection_rms(&self) -> f64 {
        self.pose.reprojection_rms
    }

    /// `[x, y, z]` Euler angles in degrees.
    pub fn angles_deg(&self) -> [f64; 3] {
        self.orientation.degrees()
    }

    /// Centroid formatted as `"cx , cy"`.
    pub fn moment_string(&self) -> String {
        format!("{} , {}", self.centroid.x, self.centroid.y)
    }
}

/// Per-frame result: a measurement or the reason the frame was dropped.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Detected(TargetMeasurement),
    Dropped(PipelineError),
}

impl FrameOutcome {
    pub fn measurement(&self) -> Option<&TargetMeasurement> {
        match self {
            FrameOutcome::Detected(m) => Some(m),
            FrameOutcome::Dropped(_) => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, FrameOutcome::Detected(_))
    }

    pub fn into_result(self) -> Result<TargetMeasurement, PipelineError> {
        match self {
            FrameOutcome::Detected(m) => Ok(m),
            FrameOutcome::Dropped(err) => Err(err),
        }
    }
}
