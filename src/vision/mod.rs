//! Vision/OCR Layer
//!
//! Prepares captured rasters for text recognition and drives the recognition engine.
//! - `filters`: per-pixel and neighbourhood transforms
//! - `region`: crop selection and mode-dependent upscaling
//! - `pipeline`: fixed-order preprocessing producing an encoded payload
//! - `ocr`: the external recognition engine boundary
//! - `session`: progress mapping and text post-processing

pub mod filters;
pub mod ocr;
pub mod pipeline;
pub mod region;
pub mod session;
#[cfg(feature = "tesseract")]
pub mod tesseract;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use ocr::{EngineParameters, RecognitionEngine, RecognitionError, RecognitionRequest};
pub use pipeline::{preprocess, EncodedImage, PreprocessOptions};
pub use region::Region;
pub use session::{RecognitionResult, RecognitionSession, ResultStatus};

/// Text granularity the recognition engine should assume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// A uniform block of multi-line text
    #[default]
    Paragraph,
    /// A single line of text
    Line,
    /// A single word
    Word,
}

impl SegmentationMode {
    /// All modes, in UI order
    pub const ALL: [SegmentationMode; 3] = [Self::Paragraph, Self::Line, Self::Word];

    /// Minimum (short side, long side) in pixels the upscaled crop should reach
    pub fn scale_targets(self) -> (u32, u32) {
        match self {
            Self::Paragraph => (1200, 2000),
            Self::Line => (200, 1500),
            Self::Word => (300, 600),
        }
    }

    /// Window divisor for the adaptive threshold (short side / divisor = half-size)
    pub fn threshold_divisor(self) -> u32 {
        match self {
            Self::Paragraph | Self::Line => 12,
            Self::Word => 16,
        }
    }

    /// Fraction below the local mean a pixel must fall to become black
    pub fn threshold_sensitivity(self) -> f64 {
        match self {
            Self::Paragraph => 0.12,
            Self::Line | Self::Word => 0.15,
        }
    }

    /// White border added around the final image
    pub fn padding(self) -> u32 {
        match self {
            Self::Paragraph => 30,
            Self::Line => 50,
            Self::Word => 60,
        }
    }

    /// How many times the sharpen kernel runs
    pub fn sharpen_passes(self) -> u32 {
        match self {
            Self::Paragraph => 1,
            Self::Line | Self::Word => 2,
        }
    }

    /// Whether broken strokes are reconnected with a morphological closing
    pub fn uses_closing(self) -> bool {
        !matches!(self, Self::Paragraph)
    }

    /// Page segmentation mode number understood by Tesseract-style engines
    pub fn page_segmentation(self) -> u8 {
        match self {
            Self::Paragraph => 6,
            Self::Line => 7,
            Self::Word => 8,
        }
    }

    /// Whether recognized lines keep their line breaks
    pub fn preserves_lines(self) -> bool {
        matches!(self, Self::Paragraph)
    }

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Line => "line",
            Self::Word => "word",
        }
    }
}

impl fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paragraph" | "block" | "6" => Ok(Self::Paragraph),
            "line" | "7" => Ok(Self::Line),
            "word" | "8" => Ok(Self::Word),
            other => Err(format!(
                "unknown segmentation mode '{}' (expected paragraph, line or word)",
                other
            )),
        }
    }
}

/// Failures while turning a source raster into an engine-ready payload
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VisionError {
    /// The source raster has no pixels
    #[error("source image has no dimensions")]
    EmptySource,
    /// The crop region is smaller than the extractor accepts
    #[error("selection is too small ({width}x{height}, minimum {min}x{min})")]
    SelectionTooSmall { width: u32, height: u32, min: u32 },
    /// The processed raster could not be encoded
    #[error("failed to encode image: {0}")]
    Encode(String),
    /// A pipeline stage failed; wraps the originating message
    #[error("{0}")]
    PreprocessingFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parameters() {
        assert_eq!(SegmentationMode::Word.scale_targets(), (300, 600));
        assert_eq!(SegmentationMode::Line.scale_targets(), (200, 1500));
        assert_eq!(SegmentationMode::Paragraph.scale_targets(), (1200, 2000));

        assert_eq!(SegmentationMode::Paragraph.threshold_divisor(), 12);
        assert_eq!(SegmentationMode::Word.threshold_divisor(), 16);
        assert!((SegmentationMode::Paragraph.threshold_sensitivity() - 0.12).abs() < 1e-6);
        assert!((SegmentationMode::Line.threshold_sensitivity() - 0.15).abs() < 1e-6);

        assert_eq!(SegmentationMode::Line.padding(), 50);
        assert_eq!(SegmentationMode::Word.sharpen_passes(), 2);
        assert!(!SegmentationMode::Paragraph.uses_closing());
        assert!(SegmentationMode::Word.uses_closing());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Line".parse::<SegmentationMode>().unwrap(), SegmentationMode::Line);
        assert_eq!("8".parse::<SegmentationMode>().unwrap(), SegmentationMode::Word);
        assert!("column".parse::<SegmentationMode>().is_err());
    }

    #[test]
    fn test_mode_serde_names() {
        let json = serde_json::to_string(&SegmentationMode::Paragraph).unwrap();
        assert_eq!(json, "\"paragraph\"");
        let parsed: SegmentationMode = serde_json::from_str("\"word\"").unwrap();
        assert_eq!(parsed, SegmentationMode::Word);
    }
}
