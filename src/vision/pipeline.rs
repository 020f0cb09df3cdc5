//! OCR preprocessing pipeline
//!
//! Runs the filters in a fixed order over an extracted region:
//! crop/scale, greyscale, contrast, sharpen, adaptive threshold, closing, padding.
//! The result is encoded as PNG for the recognition engine.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::capture::Raster;
use crate::vision::filters;
use crate::vision::region::{self, Region};
use crate::vision::{SegmentationMode, VisionError};

/// Structuring radius of the closing applied in line/word modes
const CLOSING_RADIUS: u32 = 1;

/// Pipeline parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessOptions {
    /// Granularity of the text being scanned
    pub mode: SegmentationMode,
    /// Light text on a dark background
    pub invert: bool,
}

impl PreprocessOptions {
    pub fn new(mode: SegmentationMode, invert: bool) -> Self {
        Self { mode, invert }
    }
}

/// Result of preprocessing before encoding
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Binarized, padded raster
    pub raster: Raster,
    /// Source region that was processed
    pub region: Region,
    /// Upscale factor applied to the region
    pub scale: u32,
}

/// Engine-ready payload
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// PNG bytes
    pub png: Vec<u8>,
    /// Encoded width in pixels (padding included)
    pub width: u32,
    /// Encoded height in pixels (padding included)
    pub height: u32,
    /// Upscale factor that was applied
    pub scale: u32,
}

impl EncodedImage {
    /// Base64 of the PNG bytes
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    /// `data:image/png;base64,...` URL
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }

    /// Decode the payload back into an image
    pub fn decode(&self) -> Result<DynamicImage, VisionError> {
        image::load_from_memory_with_format(&self.png, ImageFormat::Png)
            .map_err(|e| VisionError::Encode(e.to_string()))
    }

    /// Whether both sides reach the mode's minimums
    pub fn meets_minimums(&self, mode: SegmentationMode) -> bool {
        let (min_short, min_long) = mode.scale_targets();
        self.width.min(self.height) >= min_short && self.width.max(self.height) >= min_long
    }
}

/// Run every filter stage in order and return the processed raster
pub fn apply_pipeline(
    source: &Raster,
    crop: Option<Region>,
    options: &PreprocessOptions,
) -> Result<PreprocessResult, VisionError> {
    let mode = options.mode;

    // 1. Crop + upscale
    let extracted = region::extract(source, crop, mode)?;
    let mut raster = extracted.raster;

    // 2. Greyscale
    filters::greyscale(&mut raster);

    // 3. Contrast normalization
    filters::normalize_contrast(&mut raster);

    // 4. Sharpen (twice for line/word)
    for _ in 0..mode.sharpen_passes() {
        filters::sharpen(&mut raster);
    }

    // 5. Adaptive threshold
    filters::adaptive_threshold_for(&mut raster, mode, options.invert);

    // 6. Closing reconnects strokes broken by thresholding
    if mode.uses_closing() {
        filters::morphological_close(&mut raster, CLOSING_RADIUS);
    }

    // 7. White border
    let padded = filters::pad(&raster, mode.padding());

    Ok(PreprocessResult {
        raster: padded,
        region: extracted.region,
        scale: extracted.scale,
    })
}

/// Preprocess `crop` of `source` (full image when `None`) and encode it as PNG.
///
/// Nothing partial is returned: any failing stage aborts the run.
pub fn preprocess(
    source: &Raster,
    crop: Option<Region>,
    options: &PreprocessOptions,
) -> Result<EncodedImage, VisionError> {
    let start = Instant::now();
    info!(
        "Preprocessing {}x{} source ({:?} mode, invert={}, crop={:?})",
        source.width, source.height, options.mode, options.invert, crop
    );

    let result = apply_pipeline(source, crop, options)?;
    let (width, height) = result.raster.dimensions();

    let image = result
        .raster
        .into_rgba_image()
        .ok_or_else(|| VisionError::PreprocessingFailed("processed buffer does not match its dimensions".into()))?;

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| VisionError::Encode(e.to_string()))?;

    let encoded = EncodedImage {
        png,
        width,
        height,
        scale: result.scale,
    };

    if !encoded.meets_minimums(options.mode) {
        // Only reachable when the scale ceiling was hit
        warn!(
            "Preprocessed image {}x{} is below {:?} minimums even at {}x",
            width, height, options.mode, result.scale
        );
    }

    debug!(
        "Preprocessing complete in {:?}: {}x{}, {} bytes",
        start.elapsed(),
        width,
        height,
        encoded.png.len()
    );

    Ok(encoded)
}
