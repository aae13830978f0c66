//! Image sources backed by the filesystem.

use super::monitor::ImageSource;
use crate::core::errors::{CaptchaError, CaptchaResult};
use crate::utils::{Region, crop_region, load_image};
use image::DynamicImage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Watches a single image file, typically one a capture tool keeps overwriting.
///
/// An image is produced only when the file's modification time changes. A
/// missing file yields `None` rather than an error.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    region: Option<Region>,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            region: None,
            last_modified: None,
        }
    }

    /// Crops every loaded image to `region` before handing it out.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn poll(&mut self) -> CaptchaResult<Option<DynamicImage>> {
        let modified = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.modified()?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CaptchaError::Io(e)),
        };
        if self.last_modified == Some(modified) {
            return Ok(None);
        }

        let image = load_image(&self.path)?;
        // Only mark the file seen once it decoded; a half-written file is retried.
        self.last_modified = Some(modified);
        match self.region {
            Some(region) => crop_region(&image, region).map(Some),
            None => Ok(Some(image)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FileSource::new(dir.path().join("absent.png"));
        assert!(source.poll().unwrap().is_none());
    }

    #[test]
    fn test_unchanged_file_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captcha.png");
        RgbImage::from_pixel(60, 20, Rgb([5, 6, 7]))
            .save(&path)
            .unwrap();

        let mut source = FileSource::new(&path);
        let image = source.poll().unwrap().unwrap();
        assert_eq!((image.width(), image.height()), (60, 20));
        assert!(source.poll().unwrap().is_none());
    }

    #[test]
    fn test_region_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.png");
        RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]))
            .save(&path)
            .unwrap();

        let mut source = FileSource::new(&path).with_region(Region::from_corners(120, 80, 20, 30));
        let image = source.poll().unwrap().unwrap();
        assert_eq!((image.width(), image.height()), (100, 50));
    }

    #[test]
    fn test_undecodable_file_is_an_error_and_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let mut source = FileSource::new(&path);
        assert!(matches!(source.poll(), Err(CaptchaError::ImageLoad(_))));
        assert!(matches!(source.poll(), Err(CaptchaError::ImageLoad(_))));
    }
}
