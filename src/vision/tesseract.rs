//! Tesseract recognition backend
//!
//! Shells out to the system `tesseract` binary through rusty-tesseract. The engine
//! reports no intermediate progress, so only start and finish are signalled.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::vision::ocr::{ProgressSink, RecognitionEngine, RecognitionError, RecognitionRequest};

/// OCR engine mode passed to tesseract (3 = default, LSTM when available)
const DEFAULT_OEM: i32 = 3;

/// Tesseract-backed engine
#[derive(Debug, Clone, Default)]
pub struct TesseractEngine {
    /// Directory for the temporary PNG handed to tesseract; system temp dir when `None`
    pub scratch_dir: Option<PathBuf>,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn scratch_path(&self) -> PathBuf {
        let dir = self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir);
        dir.join(format!("docscan-{}.png", uuid::Uuid::new_v4()))
    }
}

/// Run tesseract on a PNG file (blocking)
fn recognize_file(path: PathBuf, request: &RecognitionRequest) -> Result<String, RecognitionError> {
    let params = &request.parameters;
    let args = rusty_tesseract::Args {
        lang: params.language.clone(),
        config_variables: params.to_variables().into_iter().collect::<HashMap<_, _>>(),
        dpi: Some(params.dpi as i32),
        psm: Some(params.page_segmentation as i32),
        oem: Some(DEFAULT_OEM),
    };

    let image = rusty_tesseract::Image::from_path(&path)
        .map_err(|e| RecognitionError::Unavailable(format!("failed to load image for tesseract: {}", e)))?;

    rusty_tesseract::image_to_string(&image, &args).map_err(|e| RecognitionError::Failed(e.to_string()))
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn recognize(
        &self,
        request: &RecognitionRequest,
        progress: &dyn ProgressSink,
    ) -> Result<String, RecognitionError> {
        progress.report(0.0);

        let path = self.scratch_path();
        tokio::fs::write(&path, &request.image.png)
            .await
            .map_err(|e| RecognitionError::Unavailable(format!("failed to write scratch image: {}", e)))?;
        debug!("Tesseract scratch image at {:?}", path);

        let owned = request.clone();
        let file = path.clone();
        let outcome = tokio::task::spawn_blocking(move || recognize_file(file, &owned))
            .await
            .map_err(|e| RecognitionError::Failed(format!("tesseract task panicked: {}", e)));

        let _ = tokio::fs::remove_file(&path).await;

        let text = outcome??;
        info!("Tesseract returned {} chars", text.len());
        progress.report(1.0);
        Ok(text)
    }
}
