//! HSV range thresholding.
//!
//! Hue follows the 8-bit convention used by most camera tooling: degrees
//! halved into `0..180`. Saturation and value span `0..=255`.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::image::{ImageError, Mask, RgbImage, RgbImageView};

/// Inclusive `[min, max]` range on one HSV channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ChannelRange {
    pub min: f64,
    pub max: f64,
}

impl ChannelRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, v: u8) -> bool {
        let v = v as f64;
        v >= self.min && v <= self.max
    }

    pub fn is_ordered(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

impl From<[f64; 2]> for ChannelRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<ChannelRange> for [f64; 2] {
    fn from(r: ChannelRange) -> Self {
        [r.min, r.max]
    }
}

/// Hue/saturation/value window selecting target pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HsvThreshold {
    pub hue: ChannelRange,
    pub saturation: ChannelRange,
    pub value: ChannelRange,
}

impl Default for HsvThreshold {
    /// Green ring light on retroreflective tape.
    fn default() -> Self {
        Self {
            hue: ChannelRange::new(80.0, 170.0),
            saturation: ChannelRange::new(0.0, 150.0),
            value: ChannelRange::new(50.0, 255.0),
        }
    }
}

impl HsvThreshold {
    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        self.hue.contains(hsv[0]) && self.saturation.contains(hsv[1]) && self.value.contains(hsv[2])
    }

    pub fn is_valid(&self) -> bool {
        self.hue.is_ordered() && self.saturation.is_ordered() && self.value.is_ordered()
    }

    /// An RGB colour this window rejects, `None` if it accepts every colour.
    ///
    /// The candidates reach both ends of every channel, so if all of them
    /// pass, the window covers the whole HSV cube.
    pub fn rejected_color(&self) -> Option<[u8; 3]> {
        const BLACK: [u8; 3] = [0, 0, 0];
        const WHITE: [u8; 3] = [255, 255, 255];
        const GREY: [u8; 3] = [128, 128, 128];
        const RED: [u8; 3] = [255, 0, 0];
        // Hue 179, the last step before wrapping to red.
        const CRIMSON: [u8; 3] = [255, 0, 6];

        [BLACK, WHITE, GREY, RED, CRIMSON]
            .into_iter()
            .find(|&rgb| !self.contains(rgb_to_hsv(rgb)))
    }
}

/// Convert one RGB pixel to 8-bit HSV (`h` in `0..180`).
#[inline]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as i32);
    let v = r.max(g).max(b);
    let vmin = r.min(g).min(b);
    let diff = v - vmin;

    let s = if v == 0 {
        0
    } else {
        ((diff * 255) as f32 / v as f32).round() as i32
    };

    let h = if diff == 0 {
        0.0
    } else {
        let d = diff as f32;
        let deg = if v == r {
            60.0 * (g - b) as f32 / d
        } else if v == g {
            120.0 + 60.0 * (b - r) as f32 / d
        } else {
            240.0 + 60.0 * (r - g) as f32 / d
        };
        let deg = if deg < 0.0 { deg + 360.0 } else { deg };
        let half = (deg * 0.5).round();
        if half >= 180.0 {
            half - 180.0
        } else {
            half
        }
    };

    [h as u8, s.clamp(0, 255) as u8, v as u8]
}

/// Binary mask of pixels whose HSV triple falls inside `threshold`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(frame, threshold), fields(width = frame.width, height = frame.height))
)]
pub fn hsv_threshold(
    frame: &RgbImageView<'_>,
    threshold: &HsvThreshold,
) -> Result<Mask, ImageError> {
    frame.validate()?;
    let mut mask = Mask::new(frame.width, frame.height)?;
    for (dst, px) in mask.data.iter_mut().zip(frame.data.chunks_exact(3)) {
        if threshold.contains(rgb_to_hsv([px[0], px[1], px[2]])) {
            *dst = Mask::SET;
        }
    }
    Ok(mask)
}

/// Copy of `frame` with every pixel outside `mask` painted a colour that
/// `threshold` rejects.
///
/// For `mask = hsv_threshold(frame, threshold)` thresholding the copy again
/// reproduces `mask`.
pub fn apply_mask(
    frame: &RgbImageView<'_>,
    mask: &Mask,
    threshold: &HsvThreshold,
) -> Result<RgbImage, ImageError> {
    frame.validate()?;
    if frame.width != mask.width || frame.height != mask.height {
        return Err(ImageError::SizeMismatch {
            left_width: frame.width,
            left_height: frame.height,
            right_width: mask.width,
            right_height: mask.height,
        });
    }
    // A window that accepts everything leaves nothing outside the mask.
    let fill = threshold.rejected_color().unwrap_or([0, 0, 0]);
    let mut out = frame.to_owned_image();
    for (px, &m) in out.data.chunks_exact_mut(3).zip(mask.data.iter()) {
        if m == 0 {
            px.copy_from_slice(&fill);
        }
    }
    Ok(out)
}
