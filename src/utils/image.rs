//! Utility functions for loading images.

use crate::core::errors::CaptchaError;
use image::DynamicImage;
use std::path::Path;

/// Loads an image from a file path, keeping its original color type.
///
/// # Errors
///
/// Returns `CaptchaError::ImageLoad` if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<DynamicImage, CaptchaError> {
    image::open(path).map_err(CaptchaError::ImageLoad)
}

/// Loads a batch of images from file paths.
///
/// Batches larger than `parallel_threshold` (default
/// [`DEFAULT_PARALLEL_THRESHOLD`](crate::core::constants::DEFAULT_PARALLEL_THRESHOLD))
/// are loaded in parallel. Each path gets its own result so one unreadable file
/// does not hide the others.
pub fn load_images<P: AsRef<Path> + Sync>(
    paths: &[P],
    parallel_threshold: Option<usize>,
) -> Vec<Result<DynamicImage, CaptchaError>> {
    use crate::core::constants::DEFAULT_PARALLEL_THRESHOLD;

    let threshold = parallel_threshold.unwrap_or(DEFAULT_PARALLEL_THRESHOLD);

    if paths.len() > threshold {
        use rayon::prelude::*;
        paths.par_iter().map(|p| load_image(p.as_ref())).collect()
    } else {
        paths.iter().map(|p| load_image(p.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_load_image_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captcha.png");
        RgbImage::from_pixel(40, 12, Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();

        let img = load_image(&path).unwrap();
        assert_eq!((img.width(), img.height()), (40, 12));
    }

    #[test]
    fn test_load_image_missing_file() {
        assert!(matches!(
            load_image(Path::new("no/such/captcha.png")),
            Err(CaptchaError::ImageLoad(_))
        ));
    }

    #[test]
    fn test_load_images_keeps_order_and_per_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..6u32 {
            let path = dir.path().join(format!("{i}.png"));
            if i != 3 {
                RgbImage::new(10 + i, 5).save(&path).unwrap();
            }
            paths.push(path);
        }

        for threshold in [Some(1), Some(100)] {
            let results = load_images(&paths, threshold);
            assert_eq!(results.len(), 6);
            for (i, result) in results.iter().enumerate() {
                if i == 3 {
                    assert!(result.is_err());
                } else {
                    assert_eq!(result.as_ref().unwrap().width(), 10 + i as u32);
                }
            }
        }
    }
}
