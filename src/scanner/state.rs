//! Scan session states and the transition function

use std::fmt;

/// Where a scan session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanState {
    /// No active raster
    #[default]
    Idle,
    /// Live camera feed running
    Streaming,
    /// Frozen or uploaded raster shown for region selection
    Cropping,
    /// Preprocessing and recognition running
    Processing,
    /// Recognized text available for editing
    Done,
    /// Something failed; waiting for retry or upload
    Error,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Cropping => "cropping",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Things that move a session between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanEvent {
    /// Camera stream acquired (open, retry, retake)
    CameraStarted,
    /// Camera permission denied or no camera
    CameraFailed,
    /// Current video frame frozen
    Captured,
    /// Capture attempted before the video was usable
    CaptureFailed,
    /// Uploaded image decoded
    ImageLoaded,
    /// Uploaded image could not be decoded
    ImageRejected,
    /// Extraction (selection or full image) started
    ExtractionStarted,
    /// Recognition finished with a result
    Recognized,
    /// Preprocessing or recognition failed
    ProcessingFailed,
    /// Recognized text committed to the caller
    Confirmed,
    /// Session closed
    Closed,
}

/// Next state for `event` in `state`, or `None` when the event is not allowed there
pub fn transition(state: ScanState, event: ScanEvent) -> Option<ScanState> {
    use ScanEvent::*;
    use ScanState::*;

    match (state, event) {
        // Closing is always allowed and abandons whatever is running
        (_, Closed) => Some(Idle),

        // Starting (or restarting) the camera: open, retake, retry
        (Idle | Streaming | Cropping | Done | Error, CameraStarted) => Some(Streaming),
        (Idle | Streaming | Cropping | Done | Error, CameraFailed) => Some(Error),

        (Streaming, Captured) => Some(Cropping),
        (Streaming, CaptureFailed) => Some(Error),

        // Upload bypasses the camera from anywhere but an in-flight extraction
        (Idle | Streaming | Cropping | Done | Error, ImageLoaded) => Some(Cropping),
        (Idle | Streaming | Cropping | Done | Error, ImageRejected) => Some(Error),

        (Cropping, ExtractionStarted) => Some(Processing),
        (Processing, Recognized) => Some(Done),
        (Processing, ProcessingFailed) => Some(Error),

        (Done, Confirmed) => Some(Idle),

        _ => None,
    }
}
