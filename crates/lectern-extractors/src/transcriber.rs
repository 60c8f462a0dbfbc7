//! Vision transcription: image + instruction in, model text out.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::{TranscriptionError, TranscriptionResult};

/// Default bound on a single vision call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// One request to a vision-capable chat model.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Instruction text sent with the image.
    pub instruction: String,
    /// Base64-encoded JPEG (no data URL prefix).
    pub image_base64: String,
}

impl TranscriptionRequest {
    /// `data:` URL form of the image.
    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.image_base64)
    }
}

/// A chat model that can read images.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send one request and return the model's text verbatim.
    async fn complete(&self, request: TranscriptionRequest) -> TranscriptionResult<String>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Shared transcriber used by every extractor that needs vision.
pub struct VisionTranscriber {
    model: Arc<dyn VisionModel>,
    timeout: Duration,
}

impl VisionTranscriber {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self {
            model,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Transcribe an image under `instruction`.
    ///
    /// The image is flattened to RGB and JPEG-encoded before upload. The
    /// call is made exactly once; a model that exceeds the timeout yields
    /// [`TranscriptionError::Timeout`].
    pub async fn transcribe(
        &self,
        image: &DynamicImage,
        instruction: &str,
    ) -> TranscriptionResult<String> {
        let image_base64 = encode_jpeg_base64(image)?;
        debug!(
            model = self.model.model_name(),
            width = image.width(),
            height = image.height(),
            payload_bytes = image_base64.len(),
            "Sending image for transcription"
        );

        let request = TranscriptionRequest {
            instruction: instruction.to_string(),
            image_base64,
        };

        match tokio::time::timeout(self.timeout, self.model.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(TranscriptionError::Timeout(self.timeout)),
        }
    }
}

/// RGB8 -> JPEG -> base64.
pub fn encode_jpeg_base64(image: &DynamicImage) -> TranscriptionResult<String> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| TranscriptionError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(buf.into_inner()))
}
