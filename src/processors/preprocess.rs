//! Image to tensor conversion for CAPTCHA recognition.

use super::normalization::NormalizeImage;
use super::resize::StretchResize;
use crate::core::batch::Tensor4D;
use crate::core::errors::{CaptchaError, CaptchaResult};
use crate::core::traits::Preprocessor;
use image::DynamicImage;

/// Converts any image into a normalized `[1, 3, H, W]` tensor.
///
/// Steps: drop alpha and expand grayscale to RGB, stretch to `H x W` with
/// bicubic interpolation, scale to [0, 1] and normalize to [-1, 1].
#[derive(Debug, Clone, Default)]
pub struct CaptchaPreprocessor {
    resize: StretchResize,
    normalize: NormalizeImage,
}

impl CaptchaPreprocessor {
    /// Creates a preprocessor for a `height x width` model input with the default normalization.
    pub fn new(height: u32, width: u32) -> CaptchaResult<Self> {
        Ok(Self {
            resize: StretchResize::new(height, width)?,
            normalize: NormalizeImage::default(),
        })
    }

    /// Replaces the normalizer.
    pub fn with_normalizer(mut self, normalize: NormalizeImage) -> Self {
        self.normalize = normalize;
        self
    }

    /// Runs the full transform on one image.
    pub fn transform(&self, image: &DynamicImage) -> CaptchaResult<Tensor4D> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CaptchaError::unsupported_image(format!(
                "image has zero size ({}x{})",
                image.width(),
                image.height()
            )));
        }
        let rgb = image.to_rgb8();
        let resized = self.resize.apply(&rgb)?;
        let tensor = self.normalize.normalize_to(&resized);
        tracing::debug!(
            input_width = image.width(),
            input_height = image.height(),
            shape = ?tensor.shape(),
            "preprocessed image"
        );
        Ok(tensor)
    }
}

impl Preprocessor for CaptchaPreprocessor {
    fn preprocess(&self, image: &DynamicImage) -> CaptchaResult<Tensor4D> {
        self.transform(image)
    }

    fn output_shape(&self) -> [usize; 3] {
        [3, self.resize.height as usize, self.resize.width as usize]
    }

    fn preprocessing_info(&self) -> String {
        format!(
            "stretch to {}x{} ({:?}), normalize to [-1, 1]",
            self.resize.height, self.resize.width, self.resize.filter
        )
    }
}
