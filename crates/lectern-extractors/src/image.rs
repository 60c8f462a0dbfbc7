//! Standalone image extraction via the vision transcriber.

use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use tracing::{info, warn};

use crate::detect;
use crate::error::{ExtractError, ExtractResult};
use crate::transcriber::VisionTranscriber;
use crate::types::{DocumentFormat, ExtractedContent, ExtractionContext, ExtractionMethod, ImageKind};
use crate::Extractor;

/// Image extractor: decode, flatten transparency, transcribe.
pub struct ImageExtractor {
    transcriber: Arc<VisionTranscriber>,
}

impl ImageExtractor {
    pub fn new(transcriber: Arc<VisionTranscriber>) -> Self {
        Self { transcriber }
    }
}

/// Composite an image onto an opaque white background.
///
/// Images without an alpha channel are converted to RGB unchanged.
pub fn flatten_onto_white(image: &DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }

    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(out)
}

/// Decode image bytes and flatten them, off the async runtime.
pub(crate) async fn decode_flattened(bytes: Vec<u8>) -> ExtractResult<DynamicImage> {
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map(|img| flatten_onto_white(&img))
            .map_err(|e| ExtractError::failed("image", e))
    })
    .await?
}

#[async_trait]
impl Extractor for ImageExtractor {
    async fn extract(
        &self,
        content: &[u8],
        ctx: &ExtractionContext,
    ) -> ExtractResult<ExtractedContent> {
        let kind = image::guess_format(content)
            .ok()
            .and_then(detect::image_kind)
            .unwrap_or(ImageKind::Png);
        let format = DocumentFormat::Image(kind);

        let image = match decode_flattened(content.to_vec()).await {
            Ok(image) => image,
            Err(e) if e.is_soft() => {
                warn!(error = %e, "Image could not be decoded");
                return Ok(ExtractedContent::empty(format, e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let text = self
            .transcriber
            .transcribe(&image, &ctx.instruction_prompt)
            .await?;

        if text.trim().is_empty() {
            warn!("Vision model returned no text for image");
            return Ok(ExtractedContent::empty(
                format,
                "vision model returned no text for image",
            ));
        }

        info!(
            format = format.label(),
            width = image.width(),
            height = image.height(),
            chars = text.len(),
            "Image transcribed"
        );

        Ok(ExtractedContent::new(text, format, ExtractionMethod::Vision)
            .with_metadata("width", image.width())
            .with_metadata("height", image.height())
            .with_metadata("model", self.transcriber.model_name()))
    }

    fn supported_types(&self) -> &[&str] {
        &[
            "image/png",
            "image/jpeg",
            "image/gif",
            "image/webp",
            "image/bmp",
            "image/tiff",
        ]
    }

    fn supports(&self, mime_type: &str) -> bool {
        mime_type.starts_with("image/")
    }

    fn name(&self) -> &str {
        "image-vision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TranscriptionError, TranscriptionResult};
    use crate::transcriber::{TranscriptionRequest, VisionModel};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    struct RecordingModel {
        reply: TranscriptionResult<String>,
        images: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingModel {
        fn replying(reply: TranscriptionResult<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                images: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl VisionModel for RecordingModel {
        async fn complete(&self, request: TranscriptionRequest) -> TranscriptionResult<String> {
            let bytes = STANDARD.decode(request.image_base64).unwrap();
            self.images.lock().unwrap().push(bytes);
            self.reply.clone()
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn transparent_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn ctx() -> ExtractionContext {
        ExtractionContext::new("describe")
    }

    #[test]
    fn test_flatten_transparent_is_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0])));
        let flat = flatten_onto_white(&img);
        assert!(!flat.color().has_alpha());
        assert_eq!(flat.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_flatten_opaque_keeps_color() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255])));
        assert_eq!(flatten_onto_white(&img).to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_flatten_half_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let [r, _, _] = flatten_onto_white(&img).to_rgb8().get_pixel(0, 0).0;
        assert!((126..=128).contains(&r));
    }

    #[tokio::test]
    async fn test_alpha_image_sent_without_alpha() {
        let model = RecordingModel::replying(Ok("Total: 42".into()));
        let extractor = ImageExtractor::new(Arc::new(VisionTranscriber::new(model.clone())));

        let content = extractor.extract(&transparent_png(), &ctx()).await.unwrap();
        assert_eq!(content.text, "Total: 42");
        assert_eq!(content.method, ExtractionMethod::Vision);
        assert_eq!(content.format, DocumentFormat::Image(ImageKind::Png));

        let images = model.images.lock().unwrap();
        assert_eq!(images.len(), 1);
        let sent = image::load_from_memory(&images[0]).unwrap();
        assert!(!sent.color().has_alpha());
        let px = sent.to_rgb8().get_pixel(4, 4).0;
        assert!(px.iter().all(|&c| c > 240), "expected white, got {px:?}");
    }

    #[tokio::test]
    async fn test_blank_reply_is_empty_result() {
        let model = RecordingModel::replying(Ok("  \n".into()));
        let extractor = ImageExtractor::new(Arc::new(VisionTranscriber::new(model)));

        let content = extractor.extract(&transparent_png(), &ctx()).await.unwrap();
        assert!(content.is_empty());
        assert_eq!(content.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_transcription_failure_is_fatal() {
        let model = RecordingModel::replying(Err(TranscriptionError::Rejected("quota".into())));
        let extractor = ImageExtractor::new(Arc::new(VisionTranscriber::new(model)));

        let err = extractor
            .extract(&transparent_png(), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Transcription(_)));
    }

    #[tokio::test]
    async fn test_undecodable_image_is_soft() {
        let model = RecordingModel::replying(Ok("unused".into()));
        let extractor = ImageExtractor::new(Arc::new(VisionTranscriber::new(model.clone())));

        let mut bytes = transparent_png();
        bytes.truncate(24);
        let content = extractor.extract(&bytes, &ctx()).await.unwrap();
        assert!(content.is_empty());
        assert!(model.images.lock().unwrap().is_empty());
    }

    #[test]
    fn test_supports_any_image() {
        let model = RecordingModel::replying(Ok(String::new()));
        let extractor = ImageExtractor::new(Arc::new(VisionTranscriber::new(model)));
        assert!(extractor.supports("image/tiff"));
        assert!(!extractor.supports("application/pdf"));
    }
}
