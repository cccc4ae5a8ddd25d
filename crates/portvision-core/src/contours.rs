//! Region outlines of a binary mask, with the hole/parent hierarchy.

use imageproc::contours::{find_contours as find_contours_in_gray, BorderType};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::image::Mask;

/// Ordered outline of one connected region, in pixel coordinates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<Point2<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point2<i32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// How traced border pixels are stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainApprox {
    /// Every border pixel.
    None,
    /// Only the end points of horizontal, vertical and diagonal runs.
    #[default]
    Simple,
}

/// A traced border together with its place in the region hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Border {
    pub contour: Contour,
    pub is_hole: bool,
    /// Index of the enclosing border in the returned list, `None` when the
    /// enclosing border is the image frame.
    pub parent: Option<usize>,
}

/// Trace every border in `mask`, holes included, with parent links.
///
/// Border following is `imageproc`'s Suzuki-Abe tracer; regions touching
/// the image edge still get closed outlines.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(mask), fields(width = mask.width, height = mask.height))
)]
pub fn trace_borders(mask: &Mask, chain: ChainApprox) -> Vec<Border> {
    let Some(gray) = mask.to_gray_image() else {
        log::warn!(
            "mask of {}x{} does not fit an image buffer",
            mask.width,
            mask.height
        );
        return Vec::new();
    };

    find_contours_in_gray::<i32>(&gray)
        .into_iter()
        .map(|c| {
            let points: Vec<Point2<i32>> =
                c.points.iter().map(|p| Point2::new(p.x, p.y)).collect();
            let points = match chain {
                ChainApprox::None => points,
                ChainApprox::Simple => compress_runs(points),
            };
            Border {
                contour: Contour::new(points),
                is_hole: c.border_type == BorderType::Hole,
                parent: c.parent,
            }
        })
        .collect()
}

/// Drop points where the chain continues in the same direction.
fn compress_runs(points: Vec<Point2<i32>>) -> Vec<Point2<i32>> {
    let n = points.len();
    if n <= 2 {
        return points;
    }
    let kept: Vec<Point2<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            cur - prev != next - cur
        })
        .map(|i| points[i])
        .collect();
    if kept.is_empty() {
        points
    } else {
        kept
    }
}

/// Region outlines in `mask`.
///
/// With `external_only` only borders directly enclosed by the image frame
/// are returned; otherwise every border, holes included. An all-background
/// mask yields an empty list.
pub fn find_contours(mask: &Mask, external_only: bool, chain: ChainApprox) -> Vec<Contour> {
    let contours: Vec<Contour> = trace_borders(mask, chain)
        .into_iter()
        .filter(|b| !external_only || (!b.is_hole && b.parent.is_none()))
        .map(|b| b.contour)
        .collect();
    log::debug!(
        "found {} contours (external_only={external_only})",
        contours.len()
    );
    contours
}
