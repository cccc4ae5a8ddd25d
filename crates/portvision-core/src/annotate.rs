//! Raster drawing for debug frames, on `image` buffers.

use ::image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_polygon_mut, draw_line_segment_mut};
use imageproc::point::Point;
use nalgebra::Point2;

use crate::contours::Contour;

/// Marker and stroke colours used on annotated frames.
pub mod palette {
    pub const CONTOUR: [u8; 3] = [0, 255, 128];
    pub const CENTROID: [u8; 3] = [0, 255, 0];
    pub const EXTREME: [u8; 3] = [255, 0, 0];
    pub const CORNER: [u8; 3] = [0, 0, 255];
}

/// Offsets of a square brush of side `thickness` centred on the stroke.
fn brush(thickness: u32) -> impl Iterator<Item = (f32, f32)> {
    let t = thickness.max(1) as i32;
    let lo = -(t - 1) / 2;
    let hi = lo + t - 1;
    (lo..=hi).flat_map(move |dy| (lo..=hi).map(move |dx| (dx as f32, dy as f32)))
}

/// Straight segment; pixels outside the frame are clipped.
pub fn draw_line(
    img: &mut RgbImage,
    from: Point2<i32>,
    to: Point2<i32>,
    rgb: [u8; 3],
    thickness: u32,
) {
    for (dx, dy) in brush(thickness) {
        draw_line_segment_mut(
            img,
            (from.x as f32 + dx, from.y as f32 + dy),
            (to.x as f32 + dx, to.y as f32 + dy),
            Rgb(rgb),
        );
    }
}

/// Closed outline through `points`.
pub fn draw_closed(img: &mut RgbImage, points: &[Point2<i32>], rgb: [u8; 3], thickness: u32) {
    let points = match points {
        [first, .., last] if first == last => &points[..points.len() - 1],
        _ => points,
    };
    match points {
        [] => {}
        [p] => draw_line(img, *p, *p, rgb, thickness),
        [a, b] => draw_line(img, *a, *b, rgb, thickness),
        _ => {
            for (dx, dy) in brush(thickness) {
                let shifted: Vec<Point<f32>> = points
                    .iter()
                    .map(|p| Point::new(p.x as f32 + dx, p.y as f32 + dy))
                    .collect();
                draw_hollow_polygon_mut(img, &shifted, Rgb(rgb));
            }
        }
    }
}

pub fn draw_contour(img: &mut RgbImage, contour: &Contour, rgb: [u8; 3], thickness: u32) {
    draw_closed(img, &contour.points, rgb, thickness);
}

/// Diamond marker whose vertices sit `size / 2` pixels from `center`.
pub fn draw_diamond(
    img: &mut RgbImage,
    center: Point2<i32>,
    rgb: [u8; 3],
    size: u32,
    thickness: u32,
) {
    let h = (size / 2) as i32;
    if h == 0 {
        draw_line(img, center, center, rgb, thickness);
        return;
    }
    let outline = [
        Point2::new(center.x, center.y - h),
        Point2::new(center.x + h, center.y),
        Point2::new(center.x, center.y + h),
        Point2::new(center.x - h, center.y),
    ];
    draw_closed(img, &outline, rgb, thickness);
}
