//! Corner labelling on the selected target contour.
//!
//! The target outline simplifies to a seven or eight sided polygon. The two
//! top corners are the extreme left and right points of the raw contour;
//! the two bottom corners are the lowest polygon vertex and whichever of its
//! neighbours sits lower.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use portvision_core::{approx_poly_dp, arc_length, Contour, ExtremePoints, Moments};

use crate::CornerError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerParams {
    /// Simplification tolerance as a fraction of the contour perimeter.
    pub approx_tolerance: f64,
    pub min_vertices: usize,
    pub max_vertices: usize,
    /// Reject label sets that do not describe an upright target.
    pub check_orientation: bool,
}

impl Default for CornerParams {
    fn default() -> Self {
        Self {
            approx_tolerance: 0.01,
            min_vertices: 7,
            max_vertices: 8,
            check_orientation: true,
        }
    }
}

impl CornerParams {
    pub fn validate(&self) -> Result<(), CornerError> {
        if !(self.approx_tolerance > 0.0 && self.approx_tolerance < 1.0) {
            return Err(CornerError::InvalidParams(format!(
                "approx_tolerance must be in (0, 1), got {}",
                self.approx_tolerance
            )));
        }
        if self.min_vertices < 3 || self.min_vertices > self.max_vertices {
            return Err(CornerError::InvalidParams(format!(
                "vertex bounds must satisfy 3 <= min <= max, got {}..={}",
                self.min_vertices, self.max_vertices
            )));
        }
        Ok(())
    }
}

/// Four labelled corners relative to the contour centroid, x right, y up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    /// Centroid in absolute pixel coordinates.
    pub centroid: Point2<f64>,
    pub top_left: Point2<f64>,
    pub top_right: Point2<f64>,
    pub bottom_right: Point2<f64>,
    pub bottom_left: Point2<f64>,
}

impl CornerSet {
    /// Express absolute pixel corners `[tl, tr, br, bl]` about `centroid`.
    pub fn from_pixels(centroid: Point2<f64>, corners: [Point2<i32>; 4]) -> Self {
        let [tl, tr, br, bl] = corners.map(|p| {
            Point2::new(p.x as f64 - centroid.x, centroid.y - p.y as f64)
        });
        Self {
            centroid,
            top_left: tl,
            top_right: tr,
            bottom_right: br,
            bottom_left: bl,
        }
    }

    /// `[tl, tr, br, bl]`, centroid-relative with y up.
    pub fn relative(&self) -> [Point2<f64>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// `[tl, tr, br, bl]` back in absolute pixel coordinates.
    pub fn to_image_points(&self) -> [Point2<f64>; 4] {
        let c = self.centroid;
        self.relative().map(|p| Point2::new(c.x + p.x, c.y - p.y))
    }
}

/// Everything the corner finder derived from one contour.
#[derive(Clone, Debug, PartialEq)]
pub struct CornerDetection {
    pub corners: CornerSet,
    /// Simplified polygon the bottom corners were taken from.
    pub polygon: Vec<Point2<i32>>,
    pub moments: Moments,
}

#[derive(Clone, Debug)]
pub struct CornerFinder {
    params: CornerParams,
}

impl CornerFinder {
    pub fn new(params: CornerParams) -> Result<Self, CornerError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &CornerParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, contour), fields(points = contour.len()))
    )]
    pub fn find(&self, contour: &Contour) -> Result<CornerDetection, CornerError> {
        let points = &contour.points;
        if points.len() < 3 {
            return Err(CornerError::TooFewPoints(points.len()));
        }

        let epsilon = self.params.approx_tolerance * arc_length(points, true);
        let polygon = approx_poly_dp(points, epsilon, true);
        let vertices = polygon.len();
        if vertices < self.params.min_vertices || vertices > self.params.max_vertices {
            log::debug!("rejecting polygon with {vertices} vertices (epsilon {epsilon:.2})");
            return Err(CornerError::VertexCount {
                vertices,
                min: self.params.min_vertices,
                max: self.params.max_vertices,
            });
        }

        let (bottom_left, bottom_right) = bottom_pair(&polygon);
        let extremes = ExtremePoints::of(points).ok_or(CornerError::TooFewPoints(0))?;

        let moments = Moments::of_polygon(points);
        let centroid = moments.centroid().ok_or(CornerError::DegenerateMoments)?;

        let corners = CornerSet::from_pixels(
            centroid,
            [
                extremes.leftmost,
                extremes.rightmost,
                bottom_right,
                bottom_left,
            ],
        );
        if self.params.check_orientation {
            check_upright(&corners)?;
        }

        Ok(CornerDetection {
            corners,
            polygon,
            moments,
        })
    }
}

/// Lowest vertex and its lower neighbour, ordered `(left, right)` by x.
fn bottom_pair(polygon: &[Point2<i32>]) -> (Point2<i32>, Point2<i32>) {
    let n = polygon.len();
    let mut lowest = 0;
    for (i, p) in polygon.iter().enumerate() {
        if p.y > polygon[lowest].y {
            lowest = i;
        }
    }
    let before = polygon[(lowest + n - 1) % n];
    let after = polygon[(lowest + 1) % n];
    let closest = if before.y > after.y { before } else { after };
    let low = polygon[lowest];
    if closest.x < low.x {
        (closest, low)
    } else {
        (low, closest)
    }
}

/// Checks that the labels describe an upright, unmirrored target.
pub fn check_upright(c: &CornerSet) -> Result<(), CornerError> {
    let lowest_top = c.top_left.y.min(c.top_right.y);
    let highest_bottom = c.bottom_left.y.max(c.bottom_right.y);
    if lowest_top <= highest_bottom {
        return Err(CornerError::InconsistentOrientation(
            "top corners are not above the bottom corners",
        ));
    }
    if c.top_left.x >= c.top_right.x {
        return Err(CornerError::InconsistentOrientation(
            "leftmost point is not left of the rightmost point",
        ));
    }
    if c.bottom_left.x >= c.bottom_right.x {
        return Err(CornerError::InconsistentOrientation(
            "bottom-left is not left of bottom-right",
        ));
    }

    let quad = c.relative();
    if segments_cross(quad[0], quad[1], quad[2], quad[3])
        || segments_cross(quad[1], quad[2], quad[3], quad[0])
    {
        return Err(CornerError::InconsistentOrientation(
            "corner quadrilateral is self-intersecting",
        ));
    }
    let twice_area: f64 = (0..4)
        .map(|i| {
            let a = quad[i];
            let b = quad[(i + 1) % 4];
            a.x * b.y - b.x * a.y
        })
        .sum();
    // Clockwise with y up.
    if twice_area >= 0.0 {
        return Err(CornerError::InconsistentOrientation(
            "corners do not run clockwise",
        ));
    }
    Ok(())
}

fn cross(o: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let (u, v): (Vector2<f64>, Vector2<f64>) = (a - o, b - o);
    u.perp(&v)
}

fn segments_cross(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>, d: Point2<f64>) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    (d1 * d2 < 0.0) && (d3 * d4 < 0.0)
}
