//! Capture Layer
//!
//! Acquisition of source rasters from a live camera stream. The camera itself is an
//! external collaborator behind [`CameraSource`]; the scanner owns at most one
//! [`StreamHandle`] at a time and the handle stops its tracks when dropped.

pub mod frame;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

pub use frame::Raster;

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Rear camera, pointed at the document
    #[default]
    Environment,
    /// Front camera
    User,
}

/// Camera acquisition configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Preferred camera
    pub facing: FacingMode,
    /// Ideal frame width
    pub ideal_width: u32,
    /// Ideal frame height
    pub ideal_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// Failures while acquiring a raster from the camera
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    /// The user refused the camera permission prompt
    #[error("camera permission denied")]
    PermissionDenied,
    /// No camera present, or it is in use elsewhere
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    /// The stream has not reported usable video dimensions yet
    #[error("video not ready")]
    NotReady,
    /// The stream was stopped before a frame could be read
    #[error("stream stopped")]
    Stopped,
}

/// A live video stream
pub trait MediaStream: Send {
    /// Current video dimensions; (0, 0) until the first frame arrives
    fn video_dimensions(&self) -> (u32, u32);

    /// Copy the current video frame into a new raster
    fn grab_frame(&mut self) -> Result<Raster, AcquisitionError>;

    /// Stop every track of the stream
    fn stop(&mut self);
}

/// Something that can open a camera stream (permission prompt included)
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Request camera access and start streaming
    async fn open(&self, config: &CaptureConfig) -> Result<Box<dyn MediaStream>, AcquisitionError>;
}

/// Exclusively owned stream; stops the underlying tracks on release or drop
pub struct StreamHandle {
    stream: Option<Box<dyn MediaStream>>,
}

impl StreamHandle {
    /// Open a stream from the given camera
    pub async fn acquire(
        camera: &dyn CameraSource,
        config: &CaptureConfig,
    ) -> Result<Self, AcquisitionError> {
        debug!(
            "Requesting camera stream ({:?}, {}x{})",
            config.facing, config.ideal_width, config.ideal_height
        );
        let stream = camera.open(config).await?;
        info!("Camera stream acquired");
        Ok(Self { stream: Some(stream) })
    }

    /// Whether the handle still owns a running stream
    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Video dimensions, or (0, 0) once released
    pub fn video_dimensions(&self) -> (u32, u32) {
        self.stream
            .as_ref()
            .map(|s| s.video_dimensions())
            .unwrap_or((0, 0))
    }

    /// Freeze the current frame. Fails with `NotReady` while the video has no size.
    pub fn freeze_frame(&mut self) -> Result<Raster, AcquisitionError> {
        let stream = self.stream.as_mut().ok_or(AcquisitionError::Stopped)?;
        let (w, h) = stream.video_dimensions();
        if w == 0 || h == 0 {
            return Err(AcquisitionError::NotReady);
        }
        stream.grab_frame()
    }

    /// Stop the stream. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            info!("Camera stream released");
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Camera source for hosts without a camera; every open fails as unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

#[async_trait]
impl CameraSource for NoCamera {
    async fn open(&self, _config: &CaptureConfig) -> Result<Box<dyn MediaStream>, AcquisitionError> {
        Err(AcquisitionError::Unavailable("no camera on this host".to_string()))
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("active", &self.is_active())
            .finish()
    }
}
