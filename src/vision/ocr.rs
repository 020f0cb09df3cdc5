//! OCR engine boundary
//!
//! The text-recognition engine is an external collaborator. It receives the encoded
//! image plus tuning parameters derived from the segmentation mode, reports progress
//! in the 0.0-1.0 range, and returns the raw recognized text.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::vision::{EncodedImage, SegmentationMode};

/// DPI hint passed to the engine for every request
pub const DEFAULT_DPI: u32 = 300;

/// Engine failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecognitionError {
    /// The engine could not be started or configured
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    /// Recognition ran and failed
    #[error("{0}")]
    Failed(String),
}

/// Tuning parameters for a single recognition
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParameters {
    /// Page segmentation mode (6 block, 7 line, 8 word)
    pub page_segmentation: u8,
    /// Keep runs of spaces between words
    pub preserve_interword_spaces: bool,
    /// Let the engine try inverted text on its own; off because the pipeline handles it
    pub auto_invert: bool,
    /// Resolution hint
    pub dpi: u32,
    /// Keep words even when confidence is low
    pub accept_low_confidence_words: bool,
    /// Minimum text line size, in x-heights
    pub min_line_size: Option<f32>,
    /// Character slope tolerance
    pub min_slope: Option<f32>,
    /// Recognition language
    pub language: String,
}

impl EngineParameters {
    /// Parameters tuned for the given mode
    pub fn for_mode(mode: SegmentationMode) -> Self {
        let (min_line_size, min_slope) = match mode {
            SegmentationMode::Paragraph => (None, None),
            // Thin single-line text
            SegmentationMode::Line => (Some(2.5), None),
            // Ignore slant variation within a single word
            SegmentationMode::Word => (Some(2.0), Some(0.0)),
        };

        Self {
            page_segmentation: mode.page_segmentation(),
            preserve_interword_spaces: true,
            auto_invert: false,
            dpi: DEFAULT_DPI,
            accept_low_confidence_words: true,
            min_line_size,
            min_slope,
            language: "eng".to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Tesseract-style configuration variables
    pub fn to_variables(&self) -> BTreeMap<String, String> {
        let flag = |b: bool| if b { "1" } else { "0" }.to_string();

        let mut vars = BTreeMap::new();
        vars.insert("tessedit_pageseg_mode".into(), self.page_segmentation.to_string());
        vars.insert("preserve_interword_spaces".into(), flag(self.preserve_interword_spaces));
        vars.insert("tessedit_do_invert".into(), flag(self.auto_invert));
        vars.insert("user_defined_dpi".into(), self.dpi.to_string());
        vars.insert("tessedit_unrej_any_wd".into(), flag(self.accept_low_confidence_words));
        if let Some(size) = self.min_line_size {
            vars.insert("textord_min_linesize".into(), size.to_string());
        }
        if let Some(slope) = self.min_slope {
            vars.insert("classify_min_slope".into(), slope.to_string());
        }
        vars
    }
}

/// Everything the engine needs for one recognition
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub image: EncodedImage,
    pub mode: SegmentationMode,
    pub parameters: EngineParameters,
}

impl RecognitionRequest {
    pub fn new(image: EncodedImage, mode: SegmentationMode) -> Self {
        Self {
            image,
            mode,
            parameters: EngineParameters::for_mode(mode),
        }
    }
}

/// Receives engine progress (0.0 - 1.0)
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f32);
}

impl<F> ProgressSink for F
where
    F: Fn(f32) + Send + Sync,
{
    fn report(&self, fraction: f32) {
        self(fraction)
    }
}

/// A text-recognition engine
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Recognize the text in `request.image`
    async fn recognize(
        &self,
        request: &RecognitionRequest,
        progress: &dyn ProgressSink,
    ) -> Result<String, RecognitionError>;
}
