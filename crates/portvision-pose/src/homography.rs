use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

/// Plane-to-plane projective map, `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    /// `None` when the point maps to infinity.
    #[inline]
    pub fn apply(&self, p: &Point2<f64>) -> Option<Point2<f64>> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        if v.z.abs() < 1e-15 {
            return None;
        }
        Some(Point2::new(v.x / v.z, v.y / v.z))
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Exact homography through four correspondences.
    ///
    /// Both point sets are Hartley-normalized before the 8x8 solve; returns
    /// `None` when the configuration is degenerate.
    pub fn from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Self> {
        let (s, t_src) = hartley_normalize(src)?;
        let (d, t_dst) = hartley_normalize(dst)?;

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        for k in 0..4 {
            let (x, y) = (s[k].x, s[k].y);
            let (u, v) = (d[k].x, d[k].y);
            let r = 2 * k;
            a[(r, 0)] = x;
            a[(r, 1)] = y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -u * x;
            a[(r, 7)] = -u * y;
            b[r] = u;

            a[(r + 1, 3)] = x;
            a[(r + 1, 4)] = y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -v * x;
            a[(r + 1, 7)] = -v * y;
            b[r + 1] = v;
        }

        let x = a.lu().solve(&b)?;
        if !x.iter().all(|v| v.is_finite()) {
            return None;
        }
        let hn = Matrix3::new(
            x[0], x[1], x[2], //
            x[3], x[4], x[5], //
            x[6], x[7], 1.0,
        );
        let h = t_dst.try_inverse()? * hn * t_src;
        let scale = h[(2, 2)];
        if scale.abs() < 1e-12 {
            return None;
        }
        Some(Self::new(h / scale))
    }
}

/// Translate the centroid to the origin and scale to mean distance sqrt(2).
fn hartley_normalize(pts: &[Point2<f64>; 4]) -> Option<([Point2<f64>; 4], Matrix3<f64>)> {
    let centroid = pts.iter().fold(Vector3::zeros(), |acc, p| {
        acc + Vector3::new(p.x, p.y, 0.0)
    }) / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - centroid.x).powi(2) + (p.y - centroid.y).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;
    if mean_dist.is_nan() || mean_dist <= 1e-12 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(
        s, 0.0, -s * centroid.x, //
        0.0, s, -s * centroid.y, //
        0.0, 0.0, 1.0,
    );
    let out = pts.map(|p| Point2::new(s * (p.x - centroid.x), s * (p.y - centroid.y)));
    Some((out, t))
}
