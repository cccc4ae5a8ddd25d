//! Rotation vectors, rotation matrices and X-Y-Z Euler angles.

use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::PoseError;

/// Frobenius bound on `R * R^T - I` for a matrix to count as a rotation.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Below this `sqrt(R00^2 + R10^2)` the decomposition is treated as gimbal
/// locked.
pub const SINGULAR_THRESHOLD: f64 = 1e-6;

const SMALL_ANGLE: f64 = 1e-12;

/// `[v]x` such that `[v]x * u = v x u`.
#[inline]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y, //
        v.z, 0.0, -v.x, //
        -v.y, v.x, 0.0,
    )
}

/// Rodrigues' formula: rotation matrix of an axis-angle vector.
pub fn rodrigues(rvec: &Vector3<f64>) -> Matrix3<f64> {
    let theta = rvec.norm();
    if theta < SMALL_ANGLE {
        return Matrix3::identity() + skew(rvec);
    }
    let k = skew(&(rvec / theta));
    Matrix3::identity() + theta.sin() * k + (1.0 - theta.cos()) * k * k
}

/// Axis-angle vector of a rotation matrix, angle in `[0, pi]`.
pub fn rotation_vector(r: &Matrix3<f64>) -> Vector3<f64> {
    Rotation3::from_matrix(r).scaled_axis()
}

/// Frobenius norm of `R * R^T - I`.
pub fn orthonormality_error(r: &Matrix3<f64>) -> f64 {
    (r * r.transpose() - Matrix3::identity()).norm()
}

pub fn is_rotation_matrix(r: &Matrix3<f64>) -> bool {
    orthonormality_error(r) < ORTHONORMAL_TOLERANCE
}

/// Euler angles in radians for `R = Rz(z) * Ry(y) * Rx(x)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Orientation {
    pub fn from_rotation_vector(rvec: &Vector3<f64>) -> Result<Self, PoseError> {
        Self::from_rotation_matrix(&rodrigues(rvec))
    }

    /// Decompose a rotation matrix; non-orthonormal input is an error.
    pub fn from_rotation_matrix(r: &Matrix3<f64>) -> Result<Self, PoseError> {
        let deviation = orthonormality_error(r);
        if deviation.is_nan() || deviation >= ORTHONORMAL_TOLERANCE {
            return Err(PoseError::NotOrthonormal { deviation });
        }

        let sy = (r[(0, 0)] * r[(0, 0)] + r[(1, 0)] * r[(1, 0)]).sqrt();
        let angles = if sy >= SINGULAR_THRESHOLD {
            Self {
                x: r[(2, 1)].atan2(r[(2, 2)]),
                y: (-r[(2, 0)]).atan2(sy),
                z: r[(1, 0)].atan2(r[(0, 0)]),
            }
        } else {
            Self {
                x: (-r[(1, 2)]).atan2(r[(1, 1)]),
                y: (-r[(2, 0)]).atan2(sy),
                z: 0.0,
            }
        };
        Ok(angles)
    }

    /// Recompose `Rz * Ry * Rx`.
    pub fn to_rotation_matrix(&self) -> Matrix3<f64> {
        Rotation3::from_euler_angles(self.x, self.y, self.z).into_inner()
    }

    /// `[x, y, z]` in degrees.
    pub fn degrees(&self) -> [f64; 3] {
        [self.x.to_degrees(), self.y.to_degrees(), self.z.to_degrees()]
    }
}

/// Lateral plus vertical offset, ignoring the optical axis.
pub fn planar_distance(t: &Vector3<f64>) -> f64 {
    (t.x * t.x + t.y * t.y).sqrt()
}

/// Distance along the optical axis.
pub fn depth_distance(t: &Vector3<f64>) -> f64 {
    t.z
}
