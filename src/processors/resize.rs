//! Fixed-size image resizing for recognition input.
//!
//! Recognition models take a fixed `H x W` input, so images are stretched to
//! that size regardless of their aspect ratio.

use crate::core::constants::DEFAULT_INPUT_SHAPE;
use crate::core::errors::{CaptchaError, CaptchaResult};
use image::RgbImage;
use image::imageops::{self, FilterType};

/// Stretches images to an exact height and width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchResize {
    /// Target height in pixels.
    pub height: u32,
    /// Target width in pixels.
    pub width: u32,
    /// Interpolation filter.
    pub filter: FilterType,
}

impl Default for StretchResize {
    fn default() -> Self {
        Self {
            height: DEFAULT_INPUT_SHAPE[1] as u32,
            width: DEFAULT_INPUT_SHAPE[2] as u32,
            filter: FilterType::CatmullRom,
        }
    }
}

impl StretchResize {
    /// Creates a bicubic (Catmull-Rom) resizer for the given target size.
    pub fn new(height: u32, width: u32) -> CaptchaResult<Self> {
        if height == 0 || width == 0 {
            return Err(CaptchaError::config_error(format!(
                "resize target must be non-zero, got {height}x{width}"
            )));
        }
        Ok(Self {
            height,
            width,
            filter: FilterType::CatmullRom,
        })
    }

    /// Overrides the interpolation filter.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Resizes `img` to the target size.
    ///
    /// Images already at the target size are returned unchanged. Zero-sized
    /// images are rejected.
    pub fn apply(&self, img: &RgbImage) -> CaptchaResult<RgbImage> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptchaError::unsupported_image(format!(
                "cannot resize a {width}x{height} image"
            )));
        }
        if (width, height) == (self.width, self.height) {
            return Ok(img.clone());
        }
        Ok(imageops::resize(img, self.width, self.height, self.filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_stretches_regardless_of_aspect_ratio() {
        let resize = StretchResize::default();
        for (w, h) in [(500, 80), (50, 800), (64, 64), (1, 1)] {
            let out = resize.apply(&RgbImage::new(w, h)).unwrap();
            assert_eq!(out.dimensions(), (128, 32), "input {w}x{h}");
        }
    }

    #[test]
    fn test_matching_size_is_untouched() {
        let mut img = RgbImage::new(128, 32);
        img.put_pixel(5, 5, Rgb([10, 200, 30]));
        let out = StretchResize::default().apply(&img).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_uniform_color_is_preserved() {
        let img = RgbImage::from_pixel(300, 70, Rgb([90, 90, 90]));
        let out = StretchResize::default().apply(&img).unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([90, 90, 90])));
    }

    #[test]
    fn test_zero_sized_image_is_unsupported() {
        let err = StretchResize::default()
            .apply(&RgbImage::new(0, 10))
            .unwrap_err();
        assert!(matches!(err, CaptchaError::UnsupportedImage { .. }));
        assert!(StretchResize::new(0, 128).is_err());
    }
}
