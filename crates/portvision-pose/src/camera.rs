use nalgebra::{Matrix3, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

use crate::PoseError;

/// Five-coefficient radial/tangential lens distortion on normalized
/// coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrownConrady5 {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    /// Fixed-point iterations used by [`BrownConrady5::undistort`].
    pub iters: u32,
}

impl Default for BrownConrady5 {
    fn default() -> Self {
        Self {
            k1: 0.0,
            k2: 0.0,
            p1: 0.0,
            p2: 0.0,
            k3: 0.0,
            iters: 20,
        }
    }
}

impl BrownConrady5 {
    /// From coefficients in OpenCV order `[k1, k2, p1, p2, k3]`.
    pub fn from_opencv(dist: [f64; 5]) -> Self {
        let [k1, k2, p1, p2, k3] = dist;
        Self {
            k1,
            k2,
            p1,
            p2,
            k3,
            ..Self::default()
        }
    }

    pub fn to_opencv(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    fn radial(&self, r2: f64) -> f64 {
        1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3))
    }

    fn tangential(&self, x: f64, y: f64, r2: f64) -> Vector2<f64> {
        Vector2::new(
            2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y,
        )
    }

    pub fn distort(&self, n: Vector2<f64>) -> Vector2<f64> {
        let r2 = n.norm_squared();
        n * self.radial(r2) + self.tangential(n.x, n.y, r2)
    }

    /// Invert [`BrownConrady5::distort`] by fixed-point iteration.
    pub fn undistort(&self, d: Vector2<f64>) -> Vector2<f64> {
        let iters = if self.iters == 0 { 20 } else { self.iters };
        let mut n = d;
        for _ in 0..iters {
            let r2 = n.norm_squared();
            let radial = self.radial(r2);
            if radial.abs() < 1e-12 {
                break;
            }
            n = (d - self.tangential(n.x, n.y, r2)) / radial;
        }
        n
    }
}

/// Pinhole intrinsics plus lens distortion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub distortion: BrownConrady5,
}

impl Default for CameraModel {
    /// Calibration of the 640x480 camera on the robot.
    fn default() -> Self {
        Self::from_opencv(
            [
                [498.54399231, 0.0, 323.63196758],
                [0.0, 497.25369582, 249.59554532],
                [0.0, 0.0, 1.0],
            ],
            [
                0.148882516,
                -0.163106020,
                0.000602445681,
                0.000117833144,
                -0.389726894,
            ],
        )
    }
}

impl CameraModel {
    /// Ideal pinhole camera.
    pub fn pinhole(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            distortion: BrownConrady5::default(),
        }
    }

    /// From an OpenCV camera matrix and `[k1, k2, p1, p2, k3]` coefficients.
    /// Skew is ignored.
    pub fn from_opencv(matrix: [[f64; 3]; 3], dist: [f64; 5]) -> Self {
        Self {
            fx: matrix[0][0],
            fy: matrix[1][1],
            cx: matrix[0][2],
            cy: matrix[1][2],
            distortion: BrownConrady5::from_opencv(dist),
        }
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    pub fn validate(&self) -> Result<(), PoseError> {
        let finite = [self.fx, self.fy, self.cx, self.cy]
            .into_iter()
            .chain(self.distortion.to_opencv())
            .all(f64::is_finite);
        if !finite {
            return Err(PoseError::InvalidCamera("non-finite parameter".into()));
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(PoseError::InvalidCamera(format!(
                "focal lengths must be positive (fx={}, fy={})",
                self.fx, self.fy
            )));
        }
        Ok(())
    }

    /// Pixel of a camera-frame point, `None` behind the image plane.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        if p.z <= f64::EPSILON {
            return None;
        }
        let n = Vector2::new(p.x / p.z, p.y / p.z);
        Some(self.pixel_from_normalized(n))
    }

    pub fn pixel_from_normalized(&self, n: Vector2<f64>) -> Point2<f64> {
        let d = self.distortion.distort(n);
        Point2::new(self.fx * d.x + self.cx, self.fy * d.y + self.cy)
    }

    /// Undistorted normalized coordinates of a pixel.
    pub fn normalize(&self, px: &Point2<f64>) -> Vector2<f64> {
        let d = Vector2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy);
        self.distortion.undistort(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn opencv_order_is_preserved() {
        let cam = CameraModel::default();
        assert_relative_eq!(cam.distortion.k3, -0.389726894);
        assert_relative_eq!(cam.distortion.p1, 0.000602445681);
        assert_eq!(
            cam.distortion.to_opencv(),
            [
                0.148882516,
                -0.163106020,
                0.000602445681,
                0.000117833144,
                -0.389726894
            ]
        );
        assert_relative_eq!(cam.matrix()[(0, 2)], 323.63196758);
    }

    #[test]
    fn undistort_inverts_distort_in_the_image_core() {
        // The robot calibration folds back beyond ~0.74 distorted radius,
        // so the extreme frame corners have no preimage.
        let cam = CameraModel::default();
        for &(u, v) in &[(320.0, 240.0), (100.0, 100.0), (500.0, 350.0), (600.0, 250.0)] {
            let px = Point2::new(u, v);
            let n = cam.normalize(&px);
            let back = cam.pixel_from_normalized(n);
            assert_relative_eq!(back.x, u, epsilon = 1e-6);
            assert_relative_eq!(back.y, v, epsilon = 1e-6);
        }
    }

    #[test]
    fn project_rejects_points_behind_camera() {
        let cam = CameraModel::pinhole(500.0, 500.0, 320.0, 240.0);
        assert!(cam.project(&Point3::new(0.0, 0.0, -1.0)).is_none());
        let p = cam.project(&Point3::new(0.2, -0.1, 2.0)).expect("in front");
        assert_relative_eq!(p.x, 370.0);
        assert_relative_eq!(p.y, 215.0);
    }

    #[test]
    fn validate_rejects_bad_focal_length() {
        let mut cam = CameraModel::default();
        assert!(cam.validate().is_ok());
        cam.fy = 0.0;
        assert!(matches!(cam.validate(), Err(PoseError::InvalidCamera(_))));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cam: CameraModel = serde_json::from_str(r#"{"fx": 600.0}"#).expect("json");
        assert_eq!(cam.fx, 600.0);
        assert_eq!(cam.fy, CameraModel::default().fy);
    }
}
