//! Region extraction and scaling policy
//!
//! Crops the requested part of a source raster and upscales it so the text is large
//! enough for the recognition engine to read reliably.

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::capture::Raster;
use crate::vision::{SegmentationMode, VisionError};

/// Smallest crop width/height the extractor accepts
pub const MIN_REGION_SIZE: u32 = 4;

/// Upper bound on the upscale factor
pub const MAX_SCALE: u32 = 6;

/// A rectangle in source-raster pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// The whole raster
    pub fn full(raster: &Raster) -> Self {
        Self::new(0, 0, raster.width, raster.height)
    }

    /// Intersect with a `width` x `height` raster
    pub fn clip(self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    /// Whether the extractor would accept this region
    pub fn is_usable(&self) -> bool {
        self.width >= MIN_REGION_SIZE && self.height >= MIN_REGION_SIZE
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for Region {
    type Err = String;

    /// Parse `x,y,width,height`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid region '{}': {}", s, e))?;

        match parts.as_slice() {
            [x, y, w, h] => Ok(Self::new(*x, *y, *w, *h)),
            _ => Err(format!("invalid region '{}': expected x,y,width,height", s)),
        }
    }
}

/// Integer upscale factor that lifts a `width` x `height` crop to the mode's minimums.
///
/// `min(6, max(1, ceil(minShort / short), ceil(minLong / long)))`
pub fn scale_factor(width: u32, height: u32, mode: SegmentationMode) -> u32 {
    let short = width.min(height).max(1);
    let long = width.max(height).max(1);
    let (min_short, min_long) = mode.scale_targets();

    let by_short = min_short.div_ceil(short);
    let by_long = min_long.div_ceil(long);

    by_short.max(by_long).max(1).min(MAX_SCALE)
}

/// A cropped and upscaled working copy
#[derive(Debug, Clone)]
pub struct ExtractedRegion {
    /// The scaled pixels
    pub raster: Raster,
    /// Region of the source that was used
    pub region: Region,
    /// Applied upscale factor
    pub scale: u32,
}

/// Crop `region` (or the full raster) out of `source` and upscale it for `mode`
pub fn extract(
    source: &Raster,
    region: Option<Region>,
    mode: SegmentationMode,
) -> Result<ExtractedRegion, VisionError> {
    if source.is_empty() {
        return Err(VisionError::EmptySource);
    }

    let region = region
        .unwrap_or_else(|| Region::full(source))
        .clip(source.width, source.height);

    if !region.is_usable() {
        return Err(VisionError::SelectionTooSmall {
            width: region.width,
            height: region.height,
            min: MIN_REGION_SIZE,
        });
    }

    let scale = scale_factor(region.width, region.height, mode);
    let target_w = region.width * scale;
    let target_h = region.height * scale;

    debug!(
        "Extracting {} from {}x{} source, {:?} mode, scale {}x -> {}x{}",
        region, source.width, source.height, mode, scale, target_w, target_h
    );

    let image = source
        .clone()
        .into_rgba_image()
        .ok_or_else(|| VisionError::PreprocessingFailed("source buffer does not match its dimensions".into()))?;

    let cropped = imageops::crop_imm(&image, region.x, region.y, region.width, region.height).to_image();
    let scaled = if scale > 1 {
        imageops::resize(&cropped, target_w, target_h, FilterType::CatmullRom)
    } else {
        cropped
    };

    Ok(ExtractedRegion {
        raster: Raster::from(scaled),
        region,
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_factor_word_example() {
        // max(1, ceil(300/100) = 3, ceil(600/150) = 4) = 4
        assert_eq!(scale_factor(100, 150, SegmentationMode::Word), 4);
        assert_eq!(scale_factor(150, 100, SegmentationMode::Word), 4);
    }

    #[test]
    fn test_scale_factor_bounds() {
        // Huge crop never shrinks
        assert_eq!(scale_factor(5000, 5000, SegmentationMode::Paragraph), 1);
        // Tiny crop is capped
        assert_eq!(scale_factor(4, 4, SegmentationMode::Word), MAX_SCALE);
        // Webcam frame, paragraph mode: ceil(1200/720) = 2, ceil(2000/1280) = 2
        assert_eq!(scale_factor(1280, 720, SegmentationMode::Paragraph), 2);
        // Thin line: ceil(200/40) = 5, ceil(1500/600) = 3
        assert_eq!(scale_factor(600, 40, SegmentationMode::Line), 5);
    }

    #[test]
    fn test_extract_rejects_small_selection() {
        let source = Raster::filled(50, 50, [255, 255, 255, 255]);
        let err = extract(&source, Some(Region::new(0, 0, 3, 20)), SegmentationMode::Word).unwrap_err();
        assert!(matches!(err, VisionError::SelectionTooSmall { width: 3, height: 20, .. }));

        let err = extract(&source, Some(Region::new(0, 0, 20, 3)), SegmentationMode::Word).unwrap_err();
        assert!(matches!(err, VisionError::SelectionTooSmall { .. }));
    }

    #[test]
    fn test_extract_accepts_minimum_selection() {
        let source = Raster::filled(50, 50, [255, 255, 255, 255]);
        let extracted = extract(&source, Some(Region::new(10, 10, 4, 4)), SegmentationMode::Word).unwrap();
        assert_eq!(extracted.scale, 6);
        assert_eq!(extracted.raster.dimensions(), (24, 24));
    }

    #[test]
    fn test_extract_empty_source() {
        let source = Raster::new(Vec::new(), 0, 0);
        assert_eq!(
            extract(&source, None, SegmentationMode::Paragraph).unwrap_err(),
            VisionError::EmptySource
        );
    }

    #[test]
    fn test_extract_clips_to_source() {
        let source = Raster::filled(20, 20, [0, 0, 0, 255]);
        let extracted = extract(&source, Some(Region::new(15, 15, 40, 40)), SegmentationMode::Word).unwrap();
        assert_eq!(extracted.region, Region::new(15, 15, 5, 5));

        let err = extract(&source, Some(Region::new(30, 30, 10, 10)), SegmentationMode::Word).unwrap_err();
        assert!(matches!(err, VisionError::SelectionTooSmall { width: 0, height: 0, .. }));
    }

    #[test]
    fn test_extract_copies_the_right_pixels() {
        let mut source = Raster::filled(10, 10, [255, 255, 255, 255]);
        for y in 2..6 {
            for x in 2..6 {
                source.set_luma(x, y, 0);
            }
        }
        // Paragraph mode scales 4x4 by 6
        let extracted = extract(&source, Some(Region::new(2, 2, 4, 4)), SegmentationMode::Paragraph).unwrap();
        assert_eq!(extracted.raster.dimensions(), (24, 24));
        assert_eq!(extracted.raster.luma(12, 12), 0);
    }

    #[test]
    fn test_region_parse() {
        assert_eq!("1, 2,30,40".parse::<Region>().unwrap(), Region::new(1, 2, 30, 40));
        assert!("1,2,3".parse::<Region>().is_err());
        assert!("a,b,c,d".parse::<Region>().is_err());
    }
}
