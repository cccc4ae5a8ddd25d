//! Image-side primitives for retroreflective target detection.
//!
//! Everything here works in pixel space: colour thresholding, border
//! tracing, polygon measures and debug drawing. Camera geometry lives in
//! `portvision-pose`.

pub mod annotate;
mod color;
mod contours;
mod geometry;
mod image;

pub use color::{apply_mask, hsv_threshold, rgb_to_hsv, ChannelRange, HsvThreshold};
pub use contours::{find_contours, trace_borders, Border, ChainApprox, Contour};
pub use geometry::{
    approx_poly_dp, arc_length, contour_area, signed_area, ExtremePoints, Moments,
};
pub use crate::image::{ImageError, Mask, RgbImage, RgbImageView};
