//! Rectangular regions selected on screen and cropping them out of captures.

use crate::core::constants::MIN_REGION_SIZE;
use crate::core::errors::{CaptchaError, CaptchaResult, ProcessingStage, SimpleError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An axis-aligned region in image coordinates, with exclusive right and bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Region {
    /// Builds a region from two opposite corners given in any order,
    /// as produced by a mouse drag.
    pub fn from_corners(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            left: x1.min(x2),
            top: y1.min(y2),
            right: x1.max(x2),
            bottom: y1.max(y2),
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// True if both sides are larger than [`MIN_REGION_SIZE`].
    pub fn is_selectable(&self) -> bool {
        self.width() > MIN_REGION_SIZE && self.height() > MIN_REGION_SIZE
    }
}

impl FromStr for Region {
    type Err = CaptchaError;

    /// Parses `x1,y1,x2,y2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<u32> = s
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|e| CaptchaError::invalid_input(format!("invalid region '{s}': {e}")))?;
        match values.as_slice() {
            &[x1, y1, x2, y2] => Ok(Self::from_corners(x1, y1, x2, y2)),
            _ => Err(CaptchaError::invalid_input(format!(
                "invalid region '{s}': expected x1,y1,x2,y2"
            ))),
        }
    }
}

/// Crops `region` out of `image`.
///
/// The region is clamped to the image bounds; it must still be larger than
/// [`MIN_REGION_SIZE`] on both sides afterwards.
pub fn crop_region(image: &DynamicImage, region: Region) -> CaptchaResult<DynamicImage> {
    let clamped = Region {
        left: region.left.min(image.width()),
        top: region.top.min(image.height()),
        right: region.right.min(image.width()),
        bottom: region.bottom.min(image.height()),
    };
    if !clamped.is_selectable() {
        return Err(CaptchaError::processing_error(
            ProcessingStage::Cropping,
            &format!(
                "region {}x{} at ({}, {}) within a {}x{} image",
                clamped.width(),
                clamped.height(),
                clamped.left,
                clamped.top,
                image.width(),
                image.height()
            ),
            SimpleError::new(format!(
                "selection must be larger than {MIN_REGION_SIZE} pixels on each side"
            )),
        ));
    }
    Ok(image.crop_imm(
        clamped.left,
        clamped.top,
        clamped.width(),
        clamped.height(),
    ))
}
