//! Four-point planar pose: homography initialisation refined with
//! Levenberg-Marquardt on pixel reprojection error.

use nalgebra::{Matrix3, Point2, Point3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::camera::CameraModel;
use crate::homography::Homography;
use crate::orientation::{rodrigues, rotation_vector};
use crate::target::TargetGeometry;
use crate::PoseError;

/// Smallest triangle height, in pixels, among the four corners.
const MIN_CORNER_SPREAD_PX: f64 = 0.5;

type Params = SVector<f64, 6>;
type Residuals = SVector<f64, 8>;
type Jacobian = SMatrix<f64, 8, 6>;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    pub max_iterations: usize,
    /// Stop once the largest gradient component drops below this.
    pub gradient_tolerance: f64,
    /// Stop once a step is this small relative to the parameter norm.
    pub step_tolerance: f64,
    /// Reject solutions whose RMS reprojection error exceeds this.
    pub max_reprojection_error_px: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            gradient_tolerance: 1e-10,
            step_tolerance: 1e-12,
            max_reprojection_error_px: 3.0,
        }
    }
}

/// Camera-from-target transform: `p_cam = R(rvec) * p_target + tvec`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
    pub success: bool,
    pub reprojection_rms: f64,
    pub iterations: usize,
}

impl Pose {
    fn failed() -> Self {
        Self {
            rvec: Vector3::zeros(),
            tvec: Vector3::zeros(),
            success: false,
            reprojection_rms: f64::INFINITY,
            iterations: 0,
        }
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        rodrigues(&self.rvec)
    }

    pub fn transform(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation_matrix() * p + self.tvec
    }
}

/// Solves for the pose of a fixed target seen by a fixed camera.
#[derive(Clone, Debug)]
pub struct PoseEstimator {
    camera: CameraModel,
    target: TargetGeometry,
    params: SolverParams,
}

impl PoseEstimator {
    pub fn new(
        camera: CameraModel,
        target: TargetGeometry,
        params: SolverParams,
    ) -> Result<Self, PoseError> {
        camera.validate()?;
        target.validate()?;
        Ok(Self {
            camera,
            target,
            params,
        })
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    pub fn target(&self) -> &TargetGeometry {
        &self.target
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Pose with a success flag; failures are logged at debug level.
    pub fn estimate(&self, image_points: &[Point2<f64>; 4]) -> Pose {
        self.solve(image_points).unwrap_or_else(|err| {
            log::debug!("pose estimation failed: {err}");
            Pose::failed()
        })
    }

    /// Pose for absolute pixel corners in `[tl, tr, br, bl]` order.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn solve(&self, image_points: &[Point2<f64>; 4]) -> Result<Pose, PoseError> {
        if !image_points
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite())
        {
            return Err(PoseError::NonFinite);
        }
        check_spread(image_points)?;

        let init = self.initial_guess(image_points)?;
        let (x, iterations) = self.refine(init, image_points)?;

        let residuals = self
            .residuals(&x, image_points)
            .ok_or(PoseError::BehindCamera { tz: x[5] })?;
        let rms = (residuals.norm_squared() / 4.0).sqrt();
        let tvec = Vector3::new(x[3], x[4], x[5]);
        if tvec.z.is_nan() || tvec.z <= 0.0 {
            return Err(PoseError::BehindCamera { tz: tvec.z });
        }
        if !rms.is_finite() || rms > self.params.max_reprojection_error_px {
            return Err(PoseError::NotConverged {
                rms,
                max: self.params.max_reprojection_error_px,
            });
        }

        log::trace!("pose converged in {iterations} iterations, rms {rms:.4} px");
        Ok(Pose {
            rvec: Vector3::new(x[0], x[1], x[2]),
            tvec,
            success: true,
            reprojection_rms: rms,
            iterations,
        })
    }

    /// Plane-induced homography on undistorted normalized coordinates,
    /// decomposed into a rotation and translation.
    fn initial_guess(&self, image_points: &[Point2<f64>; 4]) -> Result<Params, PoseError> {
        let normalized = image_points.map(|p| {
            let n = self.camera.normalize(&p);
            Point2::new(n.x, n.y)
        });
        let h = Homography::from_4pt(&self.target.plane_points(), &normalized)
            .ok_or(PoseError::Degenerate("homography is singular"))?
            .h;

        let h1 = h.column(0).into_owned();
        let h2 = h.column(1).into_owned();
        let h3 = h.column(2).into_owned();
        let scale = 0.5 * (h1.norm() + h2.norm());
        if scale.is_nan() || scale <= 1e-12 {
            return Err(PoseError::Degenerate("homography has vanishing columns"));
        }
        // The target must sit in front of the camera.
        let lambda = if h3.z < 0.0 { -1.0 / scale } else { 1.0 / scale };

        let r1 = h1 * lambda;
        let r2 = h2 * lambda;
        let r3 = r1.cross(&r2);
        let approx = Matrix3::from_columns(&[r1, r2, r3]);

        let svd = approx.svd(true, true);
        let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
            return Err(PoseError::Degenerate("rotation projection failed"));
        };
        let mut r = u * v_t;
        if r.determinant() < 0.0 {
            let mut u = u;
            u.column_mut(2).neg_mut();
            r = u * v_t;
        }

        let rvec = rotation_vector(&r);
        let t = h3 * lambda;
        Ok(Params::from_column_slice(&[
            rvec.x, rvec.y, rvec.z, t.x, t.y, t.z,
        ]))
    }

    /// Reprojection residuals in pixels, `None` if any corner projects from
    /// behind the camera.
    fn residuals(&self, x: &Params, observed: &[Point2<f64>; 4]) -> Option<Residuals> {
        let r = rodrigues(&Vector3::new(x[0], x[1], x[2]));
        let t = Vector3::new(x[3], x[4], x[5]);
        let mut out = Residuals::zeros();
        for (i, (obj, obs)) in self.target.points().iter().zip(observed).enumerate() {
            let p = self.camera.project(&(r * obj + t))?;
            out[2 * i] = p.x - obs.x;
            out[2 * i + 1] = p.y - obs.y;
        }
        Some(out)
    }

    fn jacobian(
        &self,
        x: &Params,
        r0: &Residuals,
        observed: &[Point2<f64>; 4],
    ) -> Option<Jacobian> {
        let mut jac = Jacobian::zeros();
        for j in 0..6 {
            let step = 1e-7 * x[j].abs().max(1.0);
            let mut xp = *x;
            xp[j] += step;
            let rp = self.residuals(&xp, observed)?;
            jac.set_column(j, &((rp - r0) / step));
        }
        Some(jac)
    }

    fn refine(
        &self,
        mut x: Params,
        observed: &[Point2<f64>; 4],
    ) -> Result<(Params, usize), PoseError> {
        let mut r = self
            .residuals(&x, observed)
            .ok_or(PoseError::BehindCamera { tz: x[5] })?;
        let mut cost = r.norm_squared();
        let mut damping = 1e-3;
        let mut iterations = 0;

        while iterations < self.params.max_iterations {
            iterations += 1;
            let Some(jac) = self.jacobian(&x, &r, observed) else {
                break;
            };
            let jtj = jac.transpose() * jac;
            let grad = jac.transpose() * r;
            if grad.amax() < self.params.gradient_tolerance {
                break;
            }

            let mut accepted = false;
            let mut converged = false;
            for _ in 0..12 {
                let mut a = jtj;
                for i in 0..6 {
                    a[(i, i)] += damping * jtj[(i, i)].max(1e-9);
                }
                let Some(delta) = a.lu().solve(&(-grad)) else {
                    damping *= 10.0;
                    continue;
                };
                let tol = self.params.step_tolerance;
                if delta.norm() <= tol * (x.norm() + tol) {
                    converged = true;
                    break;
                }
                let candidate = x + delta;
                match self.residuals(&candidate, observed) {
                    Some(rc) if rc.norm_squared() < cost => {
                        x = candidate;
                        r = rc;
                        cost = r.norm_squared();
                        damping = (damping * 0.1).max(1e-12);
                        accepted = true;
                        break;
                    }
                    _ => damping *= 10.0,
                }
            }
            if converged || !accepted {
                break;
            }
        }

        Ok((x, iterations))
    }
}

fn check_spread(points: &[Point2<f64>; 4]) -> Result<(), PoseError> {
    for skip in 0..4 {
        let tri: Vec<&Point2<f64>> = (0..4).filter(|&i| i != skip).map(|i| &points[i]).collect();
        let edges = [tri[1] - tri[0], tri[2] - tri[1], tri[0] - tri[2]];
        let longest = edges.iter().map(|e| e.norm()).fold(0.0, f64::max);
        let area2 = (tri[1] - tri[0]).perp(&(tri[2] - tri[0])).abs();
        if longest <= f64::EPSILON || area2 / longest < MIN_CORNER_SPREAD_PX {
            return Err(PoseError::Degenerate("image corners are nearly collinear"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn estimator(camera: CameraModel) -> PoseEstimator {
        PoseEstimator::new(camera, TargetGeometry::default(), SolverParams::default())
            .expect("estimator")
    }

    fn project_target(
        est: &PoseEstimator,
        rvec: Vector3<f64>,
        tvec: Vector3<f64>,
    ) -> [Point2<f64>; 4] {
        let r = rodrigues(&rvec);
        est.target()
            .points()
            .map(|p| est.camera().project(&(r * p + tvec)).expect("visible"))
    }

    #[test]
    fn recovers_synthetic_poses() {
        let cases = [
            (Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0)),
            (Vector3::new(0.1, -0.3, 0.05), Vector3::new(0.2, -0.1, 3.5)),
            (Vector3::new(-0.25, 0.4, -0.1), Vector3::new(-0.3, 0.15, 1.2)),
            (Vector3::new(0.05, 0.6, 0.0), Vector3::new(0.4, 0.0, 5.5)),
        ];
        for camera in [CameraModel::default(), CameraModel::pinhole(600.0, 600.0, 320.0, 240.0)] {
            let est = estimator(camera);
            for (rvec, tvec) in cases {
                let pixels = project_target(&est, rvec, tvec);
                let pose = est.solve(&pixels).expect("pose");
                assert!(pose.success);
                assert_relative_eq!(pose.rvec, rvec, epsilon = 1e-3, max_relative = 1e-3);
                assert_relative_eq!(pose.tvec, tvec, epsilon = 1e-3, max_relative = 1e-3);
                assert!(pose.reprojection_rms < 1e-4, "rms {}", pose.reprojection_rms);
            }
        }
    }

    #[test]
    fn recovers_pose_from_noisy_corners() {
        let est = estimator(CameraModel::default());
        let rvec = Vector3::new(0.05, 0.2, 0.0);
        let tvec = Vector3::new(0.1, 0.05, 2.5);
        let mut pixels = project_target(&est, rvec, tvec);
        let jitter = [(0.3, -0.2), (-0.25, 0.1), (0.15, 0.3), (-0.1, -0.3)];
        for (p, (dx, dy)) in pixels.iter_mut().zip(jitter) {
            p.x += dx;
            p.y += dy;
        }
        let pose = est.estimate(&pixels);
        assert!(pose.success);
        assert!((pose.tvec.z - 2.5).abs() < 0.05);
        assert!(pose.reprojection_rms < 1.0);
    }

    #[test]
    fn collinear_corners_fail() {
        let est = estimator(CameraModel::default());
        let line = [
            Point2::new(100.0, 100.0),
            Point2::new(200.0, 200.0),
            Point2::new(300.0, 300.0),
            Point2::new(400.0, 400.0),
        ];
        assert!(matches!(est.solve(&line), Err(PoseError::Degenerate(_))));
        let pose = est.estimate(&line);
        assert!(!pose.success);
    }

    #[test]
    fn non_finite_corners_fail() {
        let est = estimator(CameraModel::default());
        let mut pts = [Point2::new(1.0, 1.0); 4];
        pts[2].x = f64::NAN;
        assert_eq!(est.solve(&pts), Err(PoseError::NonFinite));
    }

    #[test]
    fn invalid_camera_is_rejected_at_construction() {
        let mut cam = CameraModel::default();
        cam.fx = -1.0;
        assert!(
            PoseEstimator::new(cam, TargetGeometry::default(), SolverParams::default()).is_err()
        );
    }
}
