use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::PoseError;

const METERS_PER_INCH: f64 = 0.0254;

/// Physical outline of the vision target, on the plane `z = 0` of its own
/// frame (x right, y down, meters).
///
/// Corner order matches the labels produced by the corner finder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetGeometry {
    pub top_left: Point3<f64>,
    pub top_right: Point3<f64>,
    pub bottom_right: Point3<f64>,
    pub bottom_left: Point3<f64>,
}

impl Default for TargetGeometry {
    /// Measured outline of the tape target mounted on the field.
    fn default() -> Self {
        // Inches from the target centre, y pointing down.
        Self::from_inches([
            [-18.345919, -11.913979],
            [19.9766, -10.6217],
            [10.8253, 6.25],
            [-10.07172, 6.051697],
        ])
    }
}

impl TargetGeometry {
    /// Planar corners `[tl, tr, br, bl]` given as `[x, y]` inches.
    pub fn from_inches(corners: [[f64; 2]; 4]) -> Self {
        let [tl, tr, br, bl] =
            corners.map(|[x, y]| Point3::new(x * METERS_PER_INCH, y * METERS_PER_INCH, 0.0));
        Self {
            top_left: tl,
            top_right: tr,
            bottom_right: br,
            bottom_left: bl,
        }
    }

    pub fn points(&self) -> [Point3<f64>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// In-plane coordinates, dropping `z`.
    pub fn plane_points(&self) -> [Point2<f64>; 4] {
        self.points().map(|p| Point2::new(p.x, p.y))
    }

    pub fn validate(&self) -> Result<(), PoseError> {
        let pts = self.points();
        if pts.iter().any(|p| !p.coords.iter().all(|v| v.is_finite())) {
            return Err(PoseError::InvalidTarget("non-finite corner".into()));
        }
        if pts.iter().any(|p| p.z.abs() > 1e-9) {
            return Err(PoseError::InvalidTarget("corners must lie on z = 0".into()));
        }
        let flat = self.plane_points();
        for skip in 0..4 {
            let tri: Vec<Point2<f64>> = (0..4).filter(|&i| i != skip).map(|i| flat[i]).collect();
            let area2 = (tri[1] - tri[0]).perp(&(tri[2] - tri[0]));
            if area2.abs() < 1e-8 {
                return Err(PoseError::InvalidTarget(
                    "three corners are collinear".into(),
                ));
            }
        }
        Ok(())
    }
}
