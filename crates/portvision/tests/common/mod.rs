#![allow(dead_code)]

use nalgebra::{Point2, Point3, Rotation3, Vector3};
use portvision::core::RgbImage;
use portvision::pose::{CameraModel, TargetGeometry};

pub const LIT: [u8; 3] = [100, 200, 230];
pub const BACKGROUND: [u8; 3] = [20, 20, 20];

/// Width of the tape band, meters.
const BAND: f64 = 0.08;

/// Camera-from-target transform used to render a frame.
#[derive(Clone, Copy, Debug)]
pub struct Placement {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl Placement {
    /// Upright target straight ahead at `distance` meters.
    pub fn frontal(distance: f64) -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::new(0.0, 0.0, distance),
        }
    }

    /// Upright target with its origin at `(x, y, z)` in the camera frame.
    pub fn offset(x: f64, y: f64, z: f64) -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::new(x, y, z),
        }
    }

    /// Turned by `yaw` radians about the vertical axis.
    pub fn yawed(distance: f64, yaw: f64) -> Self {
        Self {
            rotation: Rotation3::from_axis_angle(&Vector3::y_axis(), yaw),
            translation: Vector3::new(0.0, 0.0, distance),
        }
    }
}

/// Eight-sided tape outline whose outer corners are the pose corners.
pub fn band_outline(target: &TargetGeometry) -> Vec<Point2<f64>> {
    let [tl, tr, br, bl] = target.plane_points();
    vec![
        tl,
        Point2::new(tl.x + BAND, tl.y),
        Point2::new(bl.x + 0.6 * BAND, bl.y - BAND),
        Point2::new(br.x - 0.6 * BAND, br.y - BAND),
        Point2::new(tr.x - BAND, tr.y),
        tr,
        br,
        bl,
    ]
}

fn inside(poly: &[Point2<f64>], p: Point2<f64>) -> bool {
    let mut hit = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            hit = !hit;
        }
        j = i;
    }
    hit
}

/// Render the lit band as seen by `camera`.
///
/// Each pixel centre is back-projected onto the target plane. Pixels whose
/// undistortion does not round-trip are left dark.
pub fn render(
    camera: &CameraModel,
    target: &TargetGeometry,
    placement: &Placement,
    width: usize,
    height: usize,
) -> RgbImage {
    let outline = band_outline(target);
    let rt = placement.rotation.inverse();
    let origin = rt * Point3::from(-placement.translation);
    let mut img = RgbImage::filled(width, height, BACKGROUND).expect("frame size");
    for v in 0..height {
        for u in 0..width {
            let px = Point2::new(u as f64, v as f64);
            let n = camera.normalize(&px);
            if (camera.pixel_from_normalized(n) - px).norm() > 1e-3 {
                continue;
            }
            let dir = rt * Vector3::new(n.x, n.y, 1.0);
            if dir.z.abs() < 1e-12 {
                continue;
            }
            let s = -origin.z / dir.z;
            if s <= 0.0 {
                continue;
            }
            let hit = origin + dir * s;
            if inside(&outline, Point2::new(hit.x, hit.y)) {
                img.put_pixel(u as i32, v as i32, LIT);
            }
        }
    }
    img
}

/// 1280x960 pinhole camera.
pub fn sharp_camera() -> CameraModel {
    CameraModel::pinhole(1200.0, 1200.0, 640.0, 480.0)
}
