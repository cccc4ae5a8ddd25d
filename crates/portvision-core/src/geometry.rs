//! Polygon measures on integer contours: area, perimeter, moments,
//! Douglas-Peucker simplification and extreme points.

use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Shoelace area, positive for counter-clockwise order in y-up coordinates
/// (clockwise on screen).
pub fn signed_area(points: &[Point2<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        acc += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    acc as f64 * 0.5
}

/// Absolute enclosed area. Fewer than three points enclose nothing.
pub fn contour_area(points: &[Point2<i32>]) -> f64 {
    signed_area(points).abs()
}

/// Total length of the polyline, including the closing edge when `closed`.
pub fn arc_length(points: &[Point2<i32>], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    imageproc::geometry::arc_length(&to_imageproc(points), closed)
}

#[inline]
fn to_f64(v: Vector2<i32>) -> Vector2<f64> {
    Vector2::new(v.x as f64, v.y as f64)
}

fn to_imageproc(points: &[Point2<i32>]) -> Vec<Point<i32>> {
    points.iter().map(|p| Point::new(p.x, p.y)).collect()
}

/// Zeroth and first order spatial moments of a polygon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// Moments of the polygon bounded by `points`, from Green's theorem.
    ///
    /// Orientation is normalised so `m00` is never negative.
    pub fn of_polygon(points: &[Point2<i32>]) -> Self {
        let n = points.len();
        if n < 3 {
            return Self::default();
        }
        let (mut a00, mut a10, mut a01) = (0.0f64, 0.0f64, 0.0f64);
        for i in 0..n {
            let p = points[i];
            let q = points[(i + 1) % n];
            let (xi, yi, xj, yj) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
            let cross = xi * yj - xj * yi;
            a00 += cross;
            a10 += cross * (xi + xj);
            a01 += cross * (yi + yj);
        }
        let sign = if a00 < 0.0 { -1.0 } else { 1.0 };
        Self {
            m00: sign * a00 / 2.0,
            m10: sign * a10 / 6.0,
            m01: sign * a01 / 6.0,
        }
    }

    /// Area centroid, `None` for degenerate (zero-area) shapes.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.m00.abs() <= f64::EPSILON {
            return None;
        }
        Some(Point2::new(self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Douglas-Peucker polyline simplification.
///
/// Every dropped point lies within `epsilon` of the simplified outline.
/// Closed curves are split at a pair of far-apart points first, so the
/// result does not depend on where the traced contour happens to start.
/// A non-positive `epsilon` keeps every point.
pub fn approx_poly_dp(points: &[Point2<i32>], epsilon: f64, closed: bool) -> Vec<Point2<i32>> {
    let n = points.len();
    if n < 3 || epsilon.is_nan() || epsilon <= 0.0 {
        return points.to_vec();
    }
    if !closed {
        return simplify_open(&to_imageproc(points), epsilon);
    }

    let (start, far, max_dist) = split_closed(points);
    if max_dist <= epsilon {
        return vec![points[start]];
    }
    let far = if far > start { far } else { far + n };
    let span = |from: usize, to: usize| -> Vec<Point<i32>> {
        (from..=to)
            .map(|i| points[i % n])
            .map(|p| Point::new(p.x, p.y))
            .collect()
    };

    // Both halves repeat their shared end points.
    let mut out = simplify_open(&span(start, far), epsilon);
    out.pop();
    let mut back = simplify_open(&span(far, start + n), epsilon);
    back.pop();
    out.extend(back);
    out
}

fn simplify_open(curve: &[Point<i32>], epsilon: f64) -> Vec<Point2<i32>> {
    approximate_polygon_dp(curve, epsilon, false)
        .into_iter()
        .map(|p| Point2::new(p.x, p.y))
        .collect()
}

/// Pick two far-apart indices by alternating farthest-point searches.
fn split_closed(points: &[Point2<i32>]) -> (usize, usize, f64) {
    let mut start = 0usize;
    let mut far = 0usize;
    let mut best = 0.0f64;
    for iter in 0..3 {
        if iter > 0 {
            start = far;
        }
        let origin = points[start];
        best = 0.0;
        for (j, p) in points.iter().enumerate() {
            let d = to_f64(p - origin).norm_squared();
            if d > best {
                best = d;
                far = j;
            }
        }
    }
    (start, far, best.sqrt())
}

/// Index of the first point minimising `key`.
fn argmin_by<K: PartialOrd>(
    points: &[Point2<i32>],
    key: impl Fn(&Point2<i32>) -> K,
) -> Option<usize> {
    let mut best: Option<(usize, K)> = None;
    for (i, p) in points.iter().enumerate() {
        let k = key(p);
        if best.as_ref().is_none_or(|(_, b)| k < *b) {
            best = Some((i, k));
        }
    }
    best.map(|(i, _)| i)
}

/// Extreme points of a point set; ties resolve to the earliest point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtremePoints {
    pub leftmost: Point2<i32>,
    pub rightmost: Point2<i32>,
    pub topmost: Point2<i32>,
    pub bottommost: Point2<i32>,
}

impl ExtremePoints {
    /// `None` for an empty slice. "Bottom" is the largest image row.
    pub fn of(points: &[Point2<i32>]) -> Option<Self> {
        Some(Self {
            leftmost: points[argmin_by(points, |p| p.x)?],
            rightmost: points[argmin_by(points, |p| -p.x)?],
            topmost: points[argmin_by(points, |p| p.y)?],
            bottommost: points[argmin_by(points, |p| -p.y)?],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(raw: &[(i32, i32)]) -> Vec<Point2<i32>> {
        raw.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    #[test]
    fn square_area_and_perimeter() {
        let sq = pts(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        assert_relative_eq!(contour_area(&sq), 100.0);
        assert_relative_eq!(signed_area(&sq), 100.0);
        let rev: Vec<_> = sq.iter().rev().copied().collect();
        assert_relative_eq!(signed_area(&rev), -100.0);
        assert_relative_eq!(arc_length(&sq, true), 40.0);
        assert_relative_eq!(arc_length(&sq, false), 30.0);
    }

    #[test]
    fn degenerate_shapes_have_no_area() {
        assert_eq!(contour_area(&pts(&[(1, 1)])), 0.0);
        assert_eq!(contour_area(&pts(&[(0, 0), (5, 5)])), 0.0);
        assert_eq!(contour_area(&pts(&[(0, 0), (5, 5), (10, 10)])), 0.0);
        assert!(Moments::of_polygon(&pts(&[(0, 0), (5, 5), (10, 10)]))
            .centroid()
            .is_none());
    }

    #[test]
    fn centroid_of_rectangle_is_its_center() {
        let rect = pts(&[(2, 4), (12, 4), (12, 8), (2, 8)]);
        let c = Moments::of_polygon(&rect).centroid().expect("centroid");
        assert_relative_eq!(c.x, 7.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, 6.0, epsilon = 1e-12);

        let rev: Vec<_> = rect.iter().rev().copied().collect();
        let m = Moments::of_polygon(&rev);
        assert!(m.m00 > 0.0);
        assert_relative_eq!(m.centroid().expect("centroid").x, 7.0, epsilon = 1e-12);
    }

    #[test]
    fn centroid_of_triangle() {
        let tri = pts(&[(0, 0), (9, 0), (0, 9)]);
        let c = Moments::of_polygon(&tri).centroid().expect("centroid");
        assert_relative_eq!(c.x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn dp_removes_collinear_points() {
        let mut outline = Vec::new();
        for x in 0..20 {
            outline.push(Point2::new(x, 0));
        }
        for y in 0..20 {
            outline.push(Point2::new(20, y));
        }
        for x in (1..=20).rev() {
            outline.push(Point2::new(x, 20));
        }
        for y in (1..=20).rev() {
            outline.push(Point2::new(0, y));
        }
        let approx = approx_poly_dp(&outline, 0.5, true);
        assert_eq!(approx.len(), 4);
        for corner in pts(&[(0, 0), (20, 0), (20, 20), (0, 20)]) {
            assert!(approx.contains(&corner), "missing {corner:?}");
        }
    }

    #[test]
    fn dp_keeps_cyclic_order() {
        let hex = pts(&[(10, 0), (20, 5), (20, 15), (10, 20), (0, 15), (0, 5)]);
        let approx = approx_poly_dp(&hex, 0.1, true);
        assert_eq!(approx.len(), 6);
        let k = hex.iter().position(|p| *p == approx[0]).expect("vertex");
        for (i, p) in approx.iter().enumerate() {
            assert_eq!(*p, hex[(k + i) % 6]);
        }
    }

    #[test]
    fn dp_does_not_depend_on_the_start_point() {
        let rect = pts(&[(0, 0), (30, 0), (30, 20), (0, 20)]);
        let mut outline = Vec::new();
        for i in 0..4 {
            let (a, b) = (rect[i], rect[(i + 1) % 4]);
            for k in 0..10 {
                outline.push(a + (b - a) * k / 10);
            }
        }
        let mut reference = approx_poly_dp(&outline, 1.0, true);
        reference.sort_by_key(|p| (p.x, p.y));
        for shift in [7, 23, 41] {
            let mut rotated = outline.clone();
            rotated.rotate_left(shift);
            let mut approx = approx_poly_dp(&rotated, 1.0, true);
            approx.sort_by_key(|p| (p.x, p.y));
            assert_eq!(approx, reference, "shift {shift}");
        }
    }

    #[test]
    fn non_positive_tolerance_keeps_every_point() {
        let line = pts(&[(0, 0), (1, 0), (2, 0)]);
        assert_eq!(approx_poly_dp(&line, 0.0, true), line);
        assert_eq!(approx_poly_dp(&line, f64::NAN, false), line);
    }

    #[test]
    fn dp_with_large_tolerance_collapses() {
        let sq = pts(&[(0, 0), (3, 0), (3, 3), (0, 3)]);
        assert_eq!(approx_poly_dp(&sq, 100.0, true).len(), 1);
    }

    #[test]
    fn open_dp_keeps_endpoints() {
        let line = pts(&[(0, 0), (1, 0), (2, 1), (3, 0), (4, 0)]);
        let approx = approx_poly_dp(&line, 2.0, false);
        assert_eq!(approx, pts(&[(0, 0), (4, 0)]));
    }

    #[test]
    fn extreme_points_take_first_on_ties() {
        let p = pts(&[(3, 1), (0, 2), (0, 5), (7, 5), (7, 0)]);
        let e = ExtremePoints::of(&p).expect("points");
        assert_eq!(e.leftmost, Point2::new(0, 2));
        assert_eq!(e.rightmost, Point2::new(7, 5));
        assert_eq!(e.topmost, Point2::new(7, 0));
        assert_eq!(e.bottommost, Point2::new(0, 5));
        assert!(ExtremePoints::of(&[]).is_none());
    }
}
