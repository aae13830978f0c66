//! Pixel normalization into model input tensors.
//!
//! Each channel value `v` becomes `v * alpha[c] + beta[c]`, where
//! `alpha = scale / std` and `beta = -mean / std`. Output is CHW.

use crate::core::batch::Tensor4D;
use crate::core::constants::{DEFAULT_NORM_MEAN, DEFAULT_NORM_STD};
use crate::core::errors::{CaptchaError, CaptchaResult};
use image::RgbImage;
use ndarray::Array4;

/// Normalizes RGB images into `[1, 3, H, W]` tensors.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    pub alpha: [f32; 3],
    /// Offset values for each channel (beta = -mean / std)
    pub beta: [f32; 3],
}

impl NormalizeImage {
    /// Creates a normalizer.
    ///
    /// # Arguments
    ///
    /// * `scale` - Optional scaling factor (defaults to 1.0/255.0)
    /// * `mean` - Optional per-channel mean applied after scaling (defaults to 0.5)
    /// * `std` - Optional per-channel standard deviation (defaults to 0.5)
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the scale or any std value is not
    /// strictly positive, or if any parameter is not finite.
    pub fn new(
        scale: Option<f32>,
        mean: Option<[f32; 3]>,
        std: Option<[f32; 3]>,
    ) -> CaptchaResult<Self> {
        let scale = scale.unwrap_or(1.0 / 255.0);
        let mean = mean.unwrap_or(DEFAULT_NORM_MEAN);
        let std = std.unwrap_or(DEFAULT_NORM_STD);

        if !(scale.is_finite() && scale > 0.0) {
            return Err(CaptchaError::config_error(format!(
                "Scale must be a finite value greater than 0, got {scale}"
            )));
        }
        for (i, &s) in std.iter().enumerate() {
            if !(s.is_finite() && s > 0.0) {
                return Err(CaptchaError::config_error(format!(
                    "Standard deviation at index {i} must be greater than 0, got {s}"
                )));
            }
        }
        if let Some(m) = mean.iter().find(|m| !m.is_finite()) {
            return Err(CaptchaError::config_error(format!(
                "Mean values must be finite, got {m}"
            )));
        }

        let alpha = std.map(|s| scale / s);
        let mut beta = [0.0; 3];
        for c in 0..3 {
            beta[c] = -mean[c] / std[c];
        }
        Ok(Self { alpha, beta })
    }

    /// Normalizes one image into a `[1, 3, H, W]` tensor.
    pub fn normalize_to(&self, img: &RgbImage) -> Tensor4D {
        let (width, height) = img.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        for (x, y, pixel) in img.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    pixel[c] as f32 * self.alpha[c] + self.beta[c];
            }
        }
        tensor
    }
}

impl Default for NormalizeImage {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_NORM_STD.map(|s| 1.0 / 255.0 / s),
            beta: [
                -DEFAULT_NORM_MEAN[0] / DEFAULT_NORM_STD[0],
                -DEFAULT_NORM_MEAN[1] / DEFAULT_NORM_STD[1],
                -DEFAULT_NORM_MEAN[2] / DEFAULT_NORM_STD[2],
            ],
        }
    }
}
