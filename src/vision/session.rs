//! Recognition session
//!
//! Drives the recognition engine for one preprocessed image, maps engine progress
//! into the overall scan progress and normalizes the returned text.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::vision::ocr::{
    EngineParameters, ProgressSink, RecognitionEngine, RecognitionError, RecognitionRequest,
};
use crate::vision::{EncodedImage, SegmentationMode};

/// Shown instead of an empty string when nothing was recognized
pub const NO_TEXT_PLACEHOLDER: &str =
    "(No text detected; try a different text mode or better lighting)";

/// Overall progress once preprocessing is finished
pub const PROGRESS_PREPROCESSED: u8 = 20;
/// Share of the overall progress covered by the engine
const PROGRESS_ENGINE_SPAN: f32 = 75.0;
/// Overall progress once the result is ready
pub const PROGRESS_COMPLETE: u8 = 100;

/// Map engine progress (0.0 - 1.0) onto the 20 - 95 band of the overall progress
pub fn engine_progress(fraction: f32) -> u8 {
    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    (PROGRESS_PREPROCESSED as f32 + fraction * PROGRESS_ENGINE_SPAN).round() as u8
}

/// Normalize raw engine text.
///
/// Line endings become `\n`, runs of spaces/tabs collapse to one space, lines are
/// trimmed and empty ones dropped. Paragraph mode keeps line breaks; line and word
/// modes flatten everything onto one line. May return an empty string.
pub fn normalize_text(raw: &str, mode: SegmentationMode) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let lines: Vec<String> = unified
        .split('\n')
        .map(collapse_horizontal_whitespace)
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    let separator = if mode.preserves_lines() { "\n" } else { " " };
    lines.join(separator)
}

fn collapse_horizontal_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_run = false;
    for c in line.chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// How a recognition ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// The engine returned usable text
    Recognized,
    /// Nothing survived normalization; the text is the placeholder
    NoTextDetected,
}

/// Recognized text, editable until it is committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    text: String,
    status: ResultStatus,
    mode: SegmentationMode,
}

impl RecognitionResult {
    /// Normalize raw engine output, substituting the placeholder for empty text
    pub fn from_raw(raw: &str, mode: SegmentationMode) -> Self {
        let text = normalize_text(raw, mode);
        if text.is_empty() {
            Self {
                text: NO_TEXT_PLACEHOLDER.to_string(),
                status: ResultStatus::NoTextDetected,
                mode,
            }
        } else {
            Self {
                text,
                status: ResultStatus::Recognized,
                mode,
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> ResultStatus {
        self.status
    }

    pub fn mode(&self) -> SegmentationMode {
        self.mode
    }

    /// Replace the text with a user edit
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Runs recognitions against one engine
#[derive(Clone)]
pub struct RecognitionSession {
    engine: Arc<dyn RecognitionEngine>,
    language: String,
    dpi: u32,
}

impl RecognitionSession {
    pub fn new(engine: Arc<dyn RecognitionEngine>) -> Self {
        Self {
            engine,
            language: "eng".to_string(),
            dpi: crate::vision::ocr::DEFAULT_DPI,
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

    /// Build the engine request for `image` in `mode`
    pub fn request(&self, image: EncodedImage, mode: SegmentationMode) -> RecognitionRequest {
        RecognitionRequest {
            image,
            mode,
            parameters: EngineParameters::for_mode(mode)
                .with_language(self.language.clone())
                .with_dpi(self.dpi),
        }
    }

    /// Recognize `image`, reporting overall progress (20 - 100) through `on_progress`
    pub async fn run(
        &self,
        image: EncodedImage,
        mode: SegmentationMode,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<RecognitionResult, RecognitionError> {
        let start = Instant::now();
        let request = self.request(image, mode);
        info!(
            "Starting recognition: {}x{} image, psm {}, language {}",
            request.image.width, request.image.height, request.parameters.page_segmentation, self.language
        );

        on_progress(PROGRESS_PREPROCESSED);
        let sink = |fraction: f32| on_progress(engine_progress(fraction));

        let raw = match self.engine.recognize(&request, &sink as &dyn ProgressSink).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Recognition failed after {:?}: {}", start.elapsed(), e);
                return Err(e);
            }
        };

        let result = RecognitionResult::from_raw(&raw, mode);
        on_progress(PROGRESS_COMPLETE);

        debug!(
            "Recognition complete in {:?}: {:?}, {} chars",
            start.elapsed(),
            result.status(),
            result.text().len()
        );

        Ok(result)
    }
}
