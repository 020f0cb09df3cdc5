//! Scanner Controller
//!
//! One scan session for one form field: acquire a raster from the camera or an
//! upload, let the user select a region, run preprocessing and recognition, and hand
//! the confirmed text back as a [`ScanCommit`].
//!
//! The controller owns the camera stream and the frozen source raster. Every state
//! change goes through [`state::transition`]; recognition completions carry a
//! generation token so results arriving after a close or a new extraction are dropped.

pub mod selection;
pub mod state;

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capture::{AcquisitionError, CameraSource, CaptureConfig, Raster, StreamHandle};
use crate::storage::documents::FormField;
use crate::vision::{
    preprocess, EncodedImage, PreprocessOptions, RecognitionError, RecognitionResult,
    RecognitionSession, Region, SegmentationMode, VisionError,
};

pub use selection::{DragSelection, Point, SelectionRect};
pub use state::{transition, ScanEvent, ScanState};

pub const CAMERA_UNAVAILABLE_MESSAGE: &str =
    "Camera access denied or unavailable. Use \"Upload Image\" instead.";
pub const VIDEO_NOT_READY_MESSAGE: &str = "Video not ready yet, please wait a moment.";
pub const IMAGE_LOAD_MESSAGE: &str = "Could not load the selected image.";

/// Progress published while preprocessing runs
pub const PROGRESS_PREPROCESSING: u8 = 10;

/// Controller failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScanError {
    #[error("'{event:?}' is not allowed while {from}")]
    InvalidTransition { from: ScanState, event: ScanEvent },

    #[error("no valid selection to extract")]
    NoSelection,

    #[error("no recognized text to edit")]
    NoResult,

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("Preprocessing failed: {0}")]
    Preprocessing(#[from] VisionError),

    #[error("Recognition failed: {0}")]
    Recognition(#[from] RecognitionError),
}

/// Confirmed text for the field the scanner was opened for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommit {
    pub field: FormField,
    pub text: String,
}

/// What to extract from the cropping view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractTarget {
    /// The current drag selection (must be valid)
    Selection,
    /// The whole source raster
    FullImage,
    /// An explicit region in source pixels, bypassing the drag selection
    Region(Region),
}

/// A preprocessed image waiting for recognition
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    /// Generation the completion must match
    pub token: u64,
    pub image: EncodedImage,
    pub mode: SegmentationMode,
}

/// Outcome of handing a recognition completion to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Completion belonged to the current extraction; the new state
    Applied(ScanState),
    /// Completion belonged to an abandoned extraction and was ignored
    Stale,
}

/// State machine for one scan session
pub struct ScanController {
    field: FormField,
    camera: Arc<dyn CameraSource>,
    capture_config: CaptureConfig,
    state: ScanState,
    stream: Option<StreamHandle>,
    source: Option<Raster>,
    selection: DragSelection,
    options: PreprocessOptions,
    result: Option<RecognitionResult>,
    error: Option<String>,
    progress: Arc<watch::Sender<u8>>,
    generation: u64,
}

impl ScanController {
    /// Scanner for `field`, using `camera` for live capture
    pub fn new(field: FormField, camera: Arc<dyn CameraSource>) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            field,
            camera,
            capture_config: CaptureConfig::default(),
            state: ScanState::Idle,
            stream: None,
            source: None,
            selection: DragSelection::default(),
            options: PreprocessOptions::default(),
            result: None,
            error: None,
            progress: Arc::new(progress),
            generation: 0,
        }
    }

    pub fn with_capture_config(mut self, config: CaptureConfig) -> Self {
        self.capture_config = config;
        self
    }

    pub fn with_options(mut self, options: PreprocessOptions) -> Self {
        self.options = options;
        self
    }

    pub fn field(&self) -> FormField {
        self.field
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// User-facing message of the last failure, while in the error state
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&RecognitionResult> {
        self.result.as_ref()
    }

    /// Frozen frame or uploaded image shown for cropping
    pub fn source(&self) -> Option<&Raster> {
        self.source.as_ref()
    }

    pub fn selection(&self) -> &DragSelection {
        &self.selection
    }

    pub fn options(&self) -> PreprocessOptions {
        self.options
    }

    pub fn is_camera_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    /// Receiver for progress updates (0 - 100)
    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn set_mode(&mut self, mode: SegmentationMode) {
        self.options.mode = mode;
    }

    pub fn set_invert(&mut self, invert: bool) {
        self.options.invert = invert;
    }

    fn check(&self, event: ScanEvent) -> Result<ScanState, ScanError> {
        transition(self.state, event).ok_or(ScanError::InvalidTransition {
            from: self.state,
            event,
        })
    }

    fn apply(&mut self, event: ScanEvent) -> Result<ScanState, ScanError> {
        let next = self.check(event)?;
        debug!("Scanner {} -> {} on {:?}", self.state, next, event);
        self.state = next;
        Ok(next)
    }

    /// Move to the error state with a user-facing message
    fn fail(&mut self, event: ScanEvent, message: String) -> Result<(), ScanError> {
        warn!("Scan for {} failed: {}", self.field, message);
        self.release_camera();
        self.apply(event)?;
        self.error = Some(message);
        self.result = None;
        Ok(())
    }

    fn release_camera(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
    }

    fn reset_source(&mut self) {
        self.source = None;
        self.selection.clear();
        self.result = None;
        self.error = None;
        self.progress.send_replace(0);
    }

    /// Open the camera; any previous stream is stopped first
    pub async fn start_camera(&mut self) -> Result<(), ScanError> {
        self.check(ScanEvent::CameraStarted)?;
        self.release_camera();
        self.reset_source();
        self.generation += 1;

        match StreamHandle::acquire(self.camera.as_ref(), &self.capture_config).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.apply(ScanEvent::CameraStarted)?;
                info!("Scanner for {} streaming", self.field);
                Ok(())
            }
            Err(e) => {
                self.fail(ScanEvent::CameraFailed, CAMERA_UNAVAILABLE_MESSAGE.to_string())?;
                Err(e.into())
            }
        }
    }

    /// Back to the live camera from a result or an error
    pub async fn retry(&mut self) -> Result<(), ScanError> {
        if !matches!(self.state, ScanState::Done | ScanState::Error) {
            return Err(ScanError::InvalidTransition {
                from: self.state,
                event: ScanEvent::CameraStarted,
            });
        }
        self.start_camera().await
    }

    /// Discard the frozen frame and go back to the live camera
    pub async fn retake(&mut self) -> Result<(), ScanError> {
        if self.state != ScanState::Cropping {
            return Err(ScanError::InvalidTransition {
                from: self.state,
                event: ScanEvent::CameraStarted,
            });
        }
        self.start_camera().await
    }

    /// Freeze the current video frame for cropping and stop the camera
    pub fn capture(&mut self) -> Result<(), ScanError> {
        self.check(ScanEvent::Captured)?;
        let frame = match self.stream.as_mut() {
            Some(stream) => stream.freeze_frame(),
            None => Err(AcquisitionError::Stopped),
        };

        match frame {
            Ok(frame) => {
                self.release_camera();
                info!("Captured {}x{} frame", frame.width, frame.height);
                self.selection.clear();
                self.source = Some(frame);
                self.apply(ScanEvent::Captured)?;
                Ok(())
            }
            Err(e) => {
                let message = match e {
                    AcquisitionError::NotReady => VIDEO_NOT_READY_MESSAGE.to_string(),
                    ref other => format!("Capture failed: {}", other),
                };
                self.fail(ScanEvent::CaptureFailed, message)?;
                Err(e.into())
            }
        }
    }

    /// Decode an uploaded image file and show it for cropping
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<(), ScanError> {
        self.check(ScanEvent::ImageLoaded)?;
        match Raster::decode(bytes) {
            Ok(raster) => self.load_raster(raster),
            Err(e) => {
                self.fail(ScanEvent::ImageRejected, IMAGE_LOAD_MESSAGE.to_string())?;
                Err(ScanError::Decode(e.to_string()))
            }
        }
    }

    /// Show an already decoded raster for cropping
    pub fn load_raster(&mut self, raster: Raster) -> Result<(), ScanError> {
        self.check(ScanEvent::ImageLoaded)?;
        self.release_camera();
        self.reset_source();
        self.generation += 1;
        info!("Loaded {}x{} image for {}", raster.width, raster.height, self.field);
        self.source = Some(raster);
        self.apply(ScanEvent::ImageLoaded)?;
        Ok(())
    }

    /// On-screen size of the source raster; drops any selection
    pub fn set_display_size(&mut self, width: f32, height: f32) {
        self.selection.set_display_size(width, height);
    }

    pub fn begin_drag(&mut self, at: Point) {
        if self.state == ScanState::Cropping {
            self.selection.begin(at);
        }
    }

    pub fn drag_to(&mut self, to: Point) {
        if self.state == ScanState::Cropping {
            self.selection.update(to);
        }
    }

    pub fn end_drag(&mut self) {
        self.selection.end();
    }

    /// Preprocess the target and move to processing.
    ///
    /// The returned job is recognized by the caller and handed back through
    /// [`ScanController::complete`]. A preprocessing failure moves to the error state.
    pub fn begin_extraction(&mut self, target: ExtractTarget) -> Result<ExtractionJob, ScanError> {
        self.check(ScanEvent::ExtractionStarted)?;
        let source = self.source.as_ref().ok_or(ScanError::Preprocessing(VisionError::EmptySource))?;

        let region = match target {
            ExtractTarget::Selection => Some(
                self.selection
                    .source_region(source.dimensions())
                    .ok_or(ScanError::NoSelection)?,
            ),
            ExtractTarget::FullImage => None,
            ExtractTarget::Region(region) => Some(region),
        };

        self.apply(ScanEvent::ExtractionStarted)?;
        self.generation += 1;
        self.error = None;
        self.progress.send_replace(PROGRESS_PREPROCESSING);

        let options = self.options;
        let outcome = self
            .source
            .as_ref()
            .ok_or(VisionError::EmptySource)
            .and_then(|source| preprocess(source, region, &options));

        match outcome {
            Ok(image) => Ok(ExtractionJob {
                token: self.generation,
                image,
                mode: options.mode,
            }),
            Err(e) => {
                self.fail(ScanEvent::ProcessingFailed, format!("Preprocessing failed: {}", e))?;
                Err(e.into())
            }
        }
    }

    /// Publish progress for the extraction identified by `token`
    pub fn report_progress(&self, token: u64, value: u8) {
        if token == self.generation && self.state == ScanState::Processing {
            self.progress.send_replace(value.min(100));
        }
    }

    /// Apply a recognition outcome; stale tokens are ignored
    pub fn complete(
        &mut self,
        token: u64,
        outcome: Result<RecognitionResult, RecognitionError>,
    ) -> Completion {
        if token != self.generation || self.state != ScanState::Processing {
            debug!(
                "Discarding stale recognition result (token {}, current {}, state {})",
                token, self.generation, self.state
            );
            return Completion::Stale;
        }

        let applied = match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.progress.send_replace(100);
                self.apply(ScanEvent::Recognized)
            }
            Err(e) => self
                .fail(ScanEvent::ProcessingFailed, format!("Recognition failed: {}", e))
                .map(|_| self.state),
        };

        // Processing accepts both events, so this cannot be an invalid transition
        Completion::Applied(applied.unwrap_or(self.state))
    }

    /// Extract and recognize in one go
    pub async fn extract(
        &mut self,
        target: ExtractTarget,
        session: &RecognitionSession,
    ) -> Result<&RecognitionResult, ScanError> {
        let job = self.begin_extraction(target)?;
        let progress = self.progress.clone();

        let outcome = session
            .run(job.image, job.mode, &|value: u8| {
                progress.send_replace(value);
            })
            .await;

        let failure = outcome.as_ref().err().cloned();
        self.complete(job.token, outcome);

        match (failure, self.result.as_ref()) {
            (Some(e), _) => Err(e.into()),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(ScanError::NoResult),
        }
    }

    /// Replace the recognized text with a user edit
    pub fn edit_text(&mut self, text: impl Into<String>) -> Result<(), ScanError> {
        if self.state != ScanState::Done {
            return Err(ScanError::NoResult);
        }
        self.result
            .as_mut()
            .ok_or(ScanError::NoResult)?
            .set_text(text);
        Ok(())
    }

    /// Hand the text to the caller and end the session. Succeeds once per result.
    pub fn confirm(&mut self) -> Result<ScanCommit, ScanError> {
        self.check(ScanEvent::Confirmed)?;
        let result = self.result.take().ok_or(ScanError::NoResult)?;
        self.apply(ScanEvent::Confirmed)?;
        self.reset_source();

        let commit = ScanCommit {
            field: self.field,
            text: result.into_text(),
        };
        info!("Committed {} chars to {}", commit.text.len(), commit.field);
        Ok(commit)
    }

    /// Stop everything and return to idle; in-flight recognition becomes stale
    pub fn close(&mut self) {
        self.generation += 1;
        self.release_camera();
        self.reset_source();
        if self.apply(ScanEvent::Closed).is_ok() {
            debug!("Scanner for {} closed", self.field);
        }
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("field", &self.field)
            .field("state", &self.state)
            .field("camera_active", &self.is_camera_active())
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::FakeCamera;
    use crate::vision::ocr::testing::FakeEngine;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn camera() -> Arc<FakeCamera> {
        Arc::new(FakeCamera::with_frame(Raster::filled(64, 48, WHITE)))
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(40, 30, Rgba(WHITE));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn select(controller: &mut ScanController) {
        controller.set_display_size(64.0, 48.0);
        controller.begin_drag(Point::new(5.0, 5.0));
        controller.drag_to(Point::new(40.0, 30.0));
        controller.end_drag();
    }

    #[tokio::test]
    async fn test_camera_capture_releases_stream() {
        let camera = camera();
        let stats = camera.stats.clone();
        let mut controller = ScanController::new(FormField::Title, camera);

        controller.start_camera().await.unwrap();
        assert_eq!(controller.state(), ScanState::Streaming);
        assert_eq!(stats.live_streams(), 1);

        controller.capture().unwrap();
        assert_eq!(controller.state(), ScanState::Cropping);
        assert_eq!(controller.source().unwrap().dimensions(), (64, 48));
        assert_eq!(stats.live_streams(), 0);
    }

    #[tokio::test]
    async fn test_restart_stops_previous_stream() {
        let camera = camera();
        let stats = camera.stats.clone();
        let mut controller = ScanController::new(FormField::Title, camera);

        controller.start_camera().await.unwrap();
        controller.start_camera().await.unwrap();
        assert_eq!(stats.opened.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(stats.live_streams(), 1);

        controller.close();
        assert_eq!(stats.live_streams(), 0);
        assert_eq!(controller.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn test_capture_before_video_ready() {
        let camera = Arc::new(FakeCamera::not_ready(Raster::filled(64, 48, WHITE)));
        let stats = camera.stats.clone();
        let mut controller = ScanController::new(FormField::Title, camera);

        controller.start_camera().await.unwrap();
        let err = controller.capture().unwrap_err();
        assert_eq!(err, ScanError::Acquisition(AcquisitionError::NotReady));
        assert_eq!(controller.state(), ScanState::Error);
        assert_eq!(controller.error_message(), Some(VIDEO_NOT_READY_MESSAGE));
        assert_eq!(stats.live_streams(), 0);
    }

    #[tokio::test]
    async fn test_camera_denied() {
        let mut controller = ScanController::new(FormField::Title, Arc::new(FakeCamera::denied()));
        let err = controller.start_camera().await.unwrap_err();
        assert_eq!(err, ScanError::Acquisition(AcquisitionError::PermissionDenied));
        assert_eq!(controller.state(), ScanState::Error);
        assert_eq!(controller.error_message(), Some(CAMERA_UNAVAILABLE_MESSAGE));

        // Upload still works after a camera failure
        controller.load_image(&png_bytes()).unwrap();
        assert_eq!(controller.state(), ScanState::Cropping);
        assert!(controller.error_message().is_none());
    }

    #[test]
    fn test_upload_rejects_garbage() {
        let mut controller = ScanController::new(FormField::Notes, camera());
        let err = controller.load_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ScanError::Decode(_)));
        assert_eq!(controller.state(), ScanState::Error);
        assert_eq!(controller.error_message(), Some(IMAGE_LOAD_MESSAGE));
    }

    #[tokio::test]
    async fn test_upload_stops_camera() {
        let camera = camera();
        let stats = camera.stats.clone();
        let mut controller = ScanController::new(FormField::Notes, camera);

        controller.start_camera().await.unwrap();
        controller.load_image(&png_bytes()).unwrap();
        assert_eq!(stats.live_streams(), 0);
        assert_eq!(controller.source().unwrap().dimensions(), (40, 30));
    }

    #[tokio::test]
    async fn test_extract_selection_and_confirm_once() {
        let engine = Arc::new(FakeEngine::replying("  INV-2024 \r\n"));
        let session = RecognitionSession::new(engine.clone());
        let mut controller = ScanController::new(FormField::ReferenceNumber, camera());
        controller.set_mode(SegmentationMode::Word);

        controller.start_camera().await.unwrap();
        controller.capture().unwrap();
        select(&mut controller);

        let text = controller
            .extract(ExtractTarget::Selection, &session)
            .await
            .unwrap()
            .text()
            .to_string();
        assert_eq!(text, "INV-2024");
        assert_eq!(controller.state(), ScanState::Done);
        assert_eq!(controller.progress(), 100);
        assert_eq!(engine.calls(), 1);

        controller.edit_text("INV-2025").unwrap();
        let commit = controller.confirm().unwrap();
        assert_eq!(
            commit,
            ScanCommit {
                field: FormField::ReferenceNumber,
                text: "INV-2025".into()
            }
        );
        assert_eq!(controller.state(), ScanState::Idle);

        let again = controller.confirm().unwrap_err();
        assert!(matches!(again, ScanError::InvalidTransition { .. }));
    }

    #[test]
    fn test_extract_selection_requires_valid_selection() {
        let mut controller = ScanController::new(FormField::Title, camera());
        controller.load_raster(Raster::filled(64, 48, WHITE)).unwrap();
        controller.set_display_size(64.0, 48.0);
        controller.begin_drag(Point::new(5.0, 5.0));
        controller.drag_to(Point::new(12.0, 40.0));
        controller.end_drag();

        let err = controller.begin_extraction(ExtractTarget::Selection).unwrap_err();
        assert_eq!(err, ScanError::NoSelection);
        assert_eq!(controller.state(), ScanState::Cropping);

        let job = controller.begin_extraction(ExtractTarget::FullImage).unwrap();
        assert_eq!(controller.state(), ScanState::Processing);
        assert_eq!(controller.progress(), PROGRESS_PREPROCESSING);
        assert!(job.image.width > 64);
    }

    #[test]
    fn test_extract_explicit_region_below_drag_minimum() {
        let mut controller = ScanController::new(FormField::Title, camera());
        controller.load_raster(Raster::filled(64, 48, WHITE)).unwrap();
        controller.set_mode(SegmentationMode::Word);

        let job = controller
            .begin_extraction(ExtractTarget::Region(Region::new(2, 2, 6, 6)))
            .unwrap();
        assert_eq!(controller.state(), ScanState::Processing);
        // 6x6 at the 6x scale ceiling, plus word padding
        assert_eq!(job.image.width, 6 * 6 + 2 * SegmentationMode::Word.padding());
    }

    #[test]
    fn test_preprocessing_failure_message_has_single_prefix() {
        let mut controller = ScanController::new(FormField::Title, camera());
        controller.load_raster(Raster::filled(64, 48, WHITE)).unwrap();

        let err = controller
            .begin_extraction(ExtractTarget::Region(Region::new(0, 0, 2, 2)))
            .unwrap_err();
        assert!(matches!(err, ScanError::Preprocessing(VisionError::SelectionTooSmall { .. })));
        assert_eq!(controller.state(), ScanState::Error);
        let message = controller.error_message().unwrap();
        assert!(message.starts_with("Preprocessing failed: selection is too small"));

        let wrapped = ScanError::from(VisionError::PreprocessingFailed("buffer mismatch".into()));
        assert_eq!(wrapped.to_string(), "Preprocessing failed: buffer mismatch");
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut controller = ScanController::new(FormField::Title, camera());
        controller.load_raster(Raster::filled(64, 48, WHITE)).unwrap();
        let old = controller.begin_extraction(ExtractTarget::FullImage).unwrap();

        controller.close();
        let late = RecognitionResult::from_raw("late", SegmentationMode::Paragraph);
        assert_eq!(controller.complete(old.token, Ok(late)), Completion::Stale);
        assert_eq!(controller.state(), ScanState::Idle);
        assert!(controller.result().is_none());

        controller.load_raster(Raster::filled(64, 48, WHITE)).unwrap();
        let current = controller.begin_extraction(ExtractTarget::FullImage).unwrap();
        let late = RecognitionResult::from_raw("late", SegmentationMode::Paragraph);
        assert_eq!(controller.complete(old.token, Ok(late)), Completion::Stale);
        controller.report_progress(old.token, 80);
        assert_eq!(controller.progress(), PROGRESS_PREPROCESSING);

        let fresh = RecognitionResult::from_raw("fresh", SegmentationMode::Paragraph);
        assert_eq!(
            controller.complete(current.token, Ok(fresh)),
            Completion::Applied(ScanState::Done)
        );
        assert_eq!(controller.result().unwrap().text(), "fresh");
    }

    #[tokio::test]
    async fn test_recognition_failure_then_retry() {
        let session = RecognitionSession::new(Arc::new(FakeEngine::failing("engine crashed")));
        let mut controller = ScanController::new(FormField::Title, camera());
        controller.load_raster(Raster::filled(64, 48, WHITE)).unwrap();

        let err = controller
            .extract(ExtractTarget::FullImage, &session)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Recognition(_)));
        assert_eq!(controller.state(), ScanState::Error);
        assert_eq!(controller.error_message(), Some("Recognition failed: engine crashed"));
        assert!(controller.confirm().is_err());

        controller.retry().await.unwrap();
        assert_eq!(controller.state(), ScanState::Streaming);
        assert!(controller.error_message().is_none());
    }

    #[test]
    fn test_processing_blocks_new_sources() {
        let mut controller = ScanController::new(FormField::Title, camera());
        controller.load_raster(Raster::filled(64, 48, WHITE)).unwrap();
        controller.begin_extraction(ExtractTarget::FullImage).unwrap();

        let err = controller.load_raster(Raster::filled(4, 4, WHITE)).unwrap_err();
        assert_eq!(
            err,
            ScanError::InvalidTransition {
                from: ScanState::Processing,
                event: ScanEvent::ImageLoaded
            }
        );
    }

    #[tokio::test]
    async fn test_retake_from_cropping() {
        let mut controller = ScanController::new(FormField::Title, camera());
        controller.start_camera().await.unwrap();
        controller.capture().unwrap();
        controller.retake().await.unwrap();
        assert_eq!(controller.state(), ScanState::Streaming);
        assert!(controller.source().is_none());
        assert!(controller.retake().await.is_err());
    }
}
