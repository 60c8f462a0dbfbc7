//! PDF content extraction.
//!
//! Reads the embedded text layer page by page with lopdf. When the whole
//! document has no text (scanned pages), every page is rendered through a
//! [`PageRasterizer`] and transcribed by the vision model instead.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::transcriber::VisionTranscriber;
use crate::types::{
    DocumentFormat, DocumentStructure, ExtractedContent, ExtractionContext, ExtractionMethod,
};
use crate::Extractor;

/// Default render resolution for the vision fallback.
pub const DEFAULT_DPI: u32 = 200;

/// Default number of page transcriptions in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Renders PDF pages to raster images.
///
/// Called from a blocking thread; implementations may do CPU-heavy work.
pub trait PageRasterizer: Send + Sync {
    /// Render every page, in page order.
    fn render_pages(&self, pdf: &[u8], dpi: u32) -> ExtractResult<Vec<DynamicImage>>;

    /// Backend name, for logs.
    fn name(&self) -> &str;
}

/// PDF extractor with vision fallback for pages without a text layer.
pub struct PdfExtractor {
    transcriber: Arc<VisionTranscriber>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    dpi: u32,
    max_concurrency: usize,
}

impl PdfExtractor {
    /// Create a PDF extractor. Without a rasterizer, scanned PDFs yield empty text.
    pub fn new(
        transcriber: Arc<VisionTranscriber>,
        rasterizer: Option<Arc<dyn PageRasterizer>>,
    ) -> Self {
        Self {
            transcriber,
            rasterizer,
            dpi: DEFAULT_DPI,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Bound on concurrent page transcriptions (minimum 1).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    async fn transcribe_pages(
        &self,
        rasterizer: Arc<dyn PageRasterizer>,
        content: &[u8],
        ctx: &ExtractionContext,
    ) -> ExtractResult<Vec<String>> {
        let bytes = content.to_vec();
        let dpi = self.dpi;
        let images = tokio::task::spawn_blocking(move || rasterizer.render_pages(&bytes, dpi))
            .await??;

        debug!(
            pages = images.len(),
            dpi,
            concurrency = self.max_concurrency,
            "Transcribing rendered PDF pages"
        );

        // `buffered` keeps output in page order regardless of completion order.
        let texts = stream::iter(images.into_iter().enumerate())
            .map(|(index, image)| async move {
                let text = self
                    .transcriber
                    .transcribe(&image, &ctx.instruction_prompt)
                    .await?;
                debug!(page = index + 1, chars = text.len(), "Page transcribed");
                Ok::<_, ExtractError>(text)
            })
            .buffered(self.max_concurrency)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(texts)
    }
}

/// Per-page text layer, in page order.
fn read_text_layer(content: &[u8]) -> ExtractResult<Vec<String>> {
    let document =
        lopdf::Document::load_mem(content).map_err(|e| ExtractError::failed("pdf", e))?;

    let pages = document
        .get_pages()
        .keys()
        .map(|&number| match document.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                debug!(page = number, error = %e, "No extractable text on page");
                String::new()
            }
        })
        .collect();

    Ok(pages)
}

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(
        &self,
        content: &[u8],
        ctx: &ExtractionContext,
    ) -> ExtractResult<ExtractedContent> {
        let bytes = content.to_vec();
        let pages = match tokio::task::spawn_blocking(move || read_text_layer(&bytes)).await? {
            Ok(pages) => pages,
            Err(e) if e.is_soft() => {
                warn!(error = %e, "PDF could not be parsed");
                return Ok(ExtractedContent::empty(DocumentFormat::Pdf, e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let page_count = pages.len();
        if page_count == 0 {
            warn!("PDF has no pages");
            return Ok(ExtractedContent::empty(DocumentFormat::Pdf, "PDF has no pages"));
        }

        let text = pages.join("\n");
        if !text.trim().is_empty() {
            info!(pages = page_count, chars = text.len(), "PDF text layer extracted");
            return Ok(
                ExtractedContent::new(text, DocumentFormat::Pdf, ExtractionMethod::TextLayer)
                    .with_structure(DocumentStructure {
                        page_count: Some(page_count),
                        pages,
                    }),
            );
        }

        let Some(rasterizer) = self.rasterizer.clone() else {
            warn!("PDF has no text layer and no page rasterizer is configured");
            return Ok(ExtractedContent::empty(
                DocumentFormat::Pdf,
                "PDF has no text layer and page rendering is unavailable",
            ));
        };

        info!(
            pages = page_count,
            rasterizer = rasterizer.name(),
            "PDF has no text layer, falling back to vision transcription"
        );

        let transcribed = match self.transcribe_pages(rasterizer, content, ctx).await {
            Ok(texts) => texts,
            Err(e) if e.is_soft() => {
                warn!(error = %e, "PDF pages could not be rendered");
                return Ok(ExtractedContent::empty(DocumentFormat::Pdf, e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let text = transcribed.join("\n");
        if text.trim().is_empty() {
            warn!(pages = page_count, "Vision model returned no text for any page");
            return Ok(ExtractedContent::empty(
                DocumentFormat::Pdf,
                "vision model returned no text for any page",
            ));
        }

        info!(pages = transcribed.len(), chars = text.len(), "PDF transcribed");
        Ok(
            ExtractedContent::new(text, DocumentFormat::Pdf, ExtractionMethod::VisionFallback)
                .with_structure(DocumentStructure {
                    page_count: Some(transcribed.len()),
                    pages: transcribed,
                })
                .with_metadata("dpi", self.dpi)
                .with_metadata("model", self.transcriber.model_name()),
        )
    }

    fn supported_types(&self) -> &[&str] {
        &[DocumentFormat::MIME_PDF]
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

#[cfg(feature = "pdfium")]
mod pdfium_backend {
    use std::path::PathBuf;

    use image::DynamicImage;
    use pdfium_render::prelude::*;
    use tracing::debug;

    use super::PageRasterizer;
    use crate::error::{ExtractError, ExtractResult};

    /// Page rasterizer backed by a dynamically linked libpdfium.
    ///
    /// Searches the configured directory, then the current directory,
    /// then the system library path.
    #[derive(Debug, Clone, Default)]
    pub struct PdfiumRasterizer {
        library_dir: Option<PathBuf>,
    }

    impl PdfiumRasterizer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
            self.library_dir = Some(dir.into());
            self
        }

        fn bind(&self) -> ExtractResult<Pdfium> {
            let configured = self
                .library_dir
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or_else(|| "./".to_string());

            let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                &configured,
            ))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| {
                ExtractError::failed("pdf", format!("failed to load PDFium library: {e:?}"))
            })?;

            Ok(Pdfium::new(bindings))
        }
    }

    impl PageRasterizer for PdfiumRasterizer {
        fn render_pages(&self, pdf: &[u8], dpi: u32) -> ExtractResult<Vec<DynamicImage>> {
            let pdfium = self.bind()?;
            let document = pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(|e| ExtractError::failed("pdf", format!("failed to open PDF: {e:?}")))?;

            let pixels_per_point = dpi as f32 / 72.0;
            let mut images = Vec::new();

            for (index, page) in document.pages().iter().enumerate() {
                let width = (page.width().value * pixels_per_point).ceil() as i32;
                let height = (page.height().value * pixels_per_point).ceil() as i32;

                let config = PdfRenderConfig::new()
                    .set_target_width(width)
                    .set_target_height(height);

                let bitmap = page.render_with_config(&config).map_err(|e| {
                    ExtractError::failed(
                        "pdf",
                        format!("failed to render page {}: {e:?}", index + 1),
                    )
                })?;

                debug!(page = index + 1, width, height, "Rendered PDF page");
                images.push(bitmap.as_image());
            }

            Ok(images)
        }

        fn name(&self) -> &str {
            "pdfium"
        }
    }
}

#[cfg(feature = "pdfium")]
pub use pdfium_backend::PdfiumRasterizer;
