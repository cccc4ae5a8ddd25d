/// Errors raised when a raw buffer does not describe a valid image.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("invalid image buffer length (expected {expected} bytes, got {got})")]
    InvalidBufferLength { expected: usize, got: usize },
    #[error("image size mismatch ({left_width}x{left_height} vs {right_width}x{right_height})")]
    SizeMismatch {
        left_width: usize,
        left_height: usize,
        right_width: usize,
        right_height: usize,
    },
}

fn checked_len(width: usize, height: usize, channels: usize) -> Result<usize, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(ImageError::InvalidDimensions { width, height })
}

/// Borrowed 8-bit RGB frame.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, interleaved R,G,B, len = w*h*3
}

impl<'a> RgbImageView<'a> {
    /// Wrap a raw interleaved RGB buffer, validating its length.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        let expected = checked_len(width, height, 3)?;
        if data.len() != expected {
            return Err(ImageError::InvalidBufferLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Re-check the invariants of a view built with a struct literal.
    pub fn validate(&self) -> Result<(), ImageError> {
        Self::new(self.width, self.height, self.data).map(|_| ())
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Copy into an `image` buffer, e.g. to draw on it.
    pub fn to_rgb_buffer(&self) -> Option<::image::RgbImage> {
        let width = u32::try_from(self.width).ok()?;
        let height = u32::try_from(self.height).ok()?;
        ::image::RgbImage::from_raw(width, height, self.data.to_vec())
    }

    pub fn to_owned_image(&self) -> RgbImage {
        RgbImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }
}

/// Owned 8-bit RGB frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    /// A frame filled with a single color.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Result<Self, ImageError> {
        let len = checked_len(width, height, 3)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        RgbImageView::new(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_rgb_buffer(buf: ::image::RgbImage) -> Result<Self, ImageError> {
        let (width, height) = (buf.width() as usize, buf.height() as usize);
        Self::from_raw(width, height, buf.into_raw())
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        self.view().pixel(x, y)
    }

    /// Write a pixel; coordinates outside the frame are ignored.
    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }
}

/// Binary single-channel image. Set pixels hold 255, cleared pixels 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Mask {
    pub const SET: u8 = 255;

    pub fn new(width: usize, height: usize) -> Result<Self, ImageError> {
        let len = checked_len(width, height, 1)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Build a mask from raw bytes; any non-zero byte counts as set.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = checked_len(width, height, 1)?;
        if data.len() != expected {
            return Err(ImageError::InvalidBufferLength {
                expected,
                got: data.len(),
            });
        }
        let data = data
            .into_iter()
            .map(|v| if v != 0 { Self::SET } else { 0 })
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Out-of-bounds coordinates read as cleared.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.data[y as usize * self.width + x as usize] != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        self.data[y * self.width + x] = if on { Self::SET } else { 0 };
    }

    /// Copy into an `image` buffer for the `imageproc` routines.
    pub fn to_gray_image(&self) -> Option<::image::GrayImage> {
        let width = u32::try_from(self.width).ok()?;
        let height = u32::try_from(self.height).ok()?;
        ::image::GrayImage::from_raw(width, height, self.data.clone())
    }

    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rejects_short_buffer() {
        let data = vec![0u8; 3 * 4 * 2 - 1];
        let err = RgbImageView::new(4, 2, &data).unwrap_err();
        assert_eq!(
            err,
            ImageError::InvalidBufferLength {
                expected: 24,
                got: 23
            }
        );
    }

    #[test]
    fn zero_sized_frames_are_invalid() {
        assert!(matches!(
            RgbImage::filled(0, 10, [0, 0, 0]),
            Err(ImageError::InvalidDimensions { .. })
        ));
        assert!(Mask::new(3, 0).is_err());
    }

    #[test]
    fn put_pixel_ignores_out_of_bounds() {
        let mut img = RgbImage::filled(2, 2, [1, 2, 3]).expect("frame");
        img.put_pixel(-1, 0, [9, 9, 9]);
        img.put_pixel(2, 1, [9, 9, 9]);
        img.put_pixel(1, 1, [7, 8, 9]);
        assert_eq!(img.pixel(0, 0), [1, 2, 3]);
        assert_eq!(img.pixel(1, 1), [7, 8, 9]);
    }

    #[test]
    fn mask_from_raw_normalizes_values() {
        let mask = Mask::from_raw(2, 2, vec![0, 1, 200, 0]).expect("mask");
        assert_eq!(mask.data, vec![0, 255, 255, 0]);
        assert_eq!(mask.count_set(), 2);
        assert!(mask.get(1, 0));
        assert!(!mask.get(5, 5));
    }

    #[test]
    fn buffers_convert_both_ways() {
        let mut img = RgbImage::filled(3, 2, [1, 2, 3]).expect("frame");
        img.put_pixel(2, 1, [7, 8, 9]);
        let buf = img.view().to_rgb_buffer().expect("buffer");
        assert_eq!(buf.get_pixel(2, 1).0, [7, 8, 9]);
        assert_eq!(RgbImage::from_rgb_buffer(buf), Ok(img));

        let mask = Mask::from_raw(2, 2, vec![0, 1, 0, 0]).expect("mask");
        let gray = mask.to_gray_image().expect("gray");
        assert_eq!(gray.get_pixel(1, 0).0, [255]);
        assert_eq!(gray.dimensions(), (2, 2));
    }
}
