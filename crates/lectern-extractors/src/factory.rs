//! Factory for creating extractors.

use std::path::PathBuf;
use std::sync::Arc;

use crate::docx::DocxExtractor;
use crate::image::ImageExtractor;
use crate::pdf::{PageRasterizer, PdfExtractor, DEFAULT_DPI, DEFAULT_MAX_CONCURRENCY};
use crate::spreadsheet::SpreadsheetExtractor;
use crate::transcriber::VisionTranscriber;
use crate::types::{DocumentFormat, FormatFamily};
use crate::Extractor;

/// Tunables shared by the default extractor set.
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    /// Render resolution for scanned PDF pages.
    pub dpi: u32,
    /// Page transcriptions in flight at once.
    pub max_concurrent_transcriptions: usize,
    /// Directory holding libpdfium, searched before the system path.
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            max_concurrent_transcriptions: DEFAULT_MAX_CONCURRENCY,
            pdfium_library_dir: None,
        }
    }
}

/// Factory for creating content extractors.
pub struct ExtractorFactory;

impl ExtractorFactory {
    /// Page rasterizer compiled into this build, if any.
    #[cfg(feature = "pdfium")]
    pub fn rasterizer(settings: &ExtractorSettings) -> Option<Arc<dyn PageRasterizer>> {
        let mut rasterizer = crate::pdf::PdfiumRasterizer::new();
        if let Some(dir) = &settings.pdfium_library_dir {
            rasterizer = rasterizer.with_library_dir(dir);
        }
        Some(Arc::new(rasterizer))
    }

    #[cfg(not(feature = "pdfium"))]
    pub fn rasterizer(_settings: &ExtractorSettings) -> Option<Arc<dyn PageRasterizer>> {
        None
    }

    /// Create a PDF extractor with the default rasterizer.
    pub fn pdf(
        transcriber: Arc<VisionTranscriber>,
        settings: &ExtractorSettings,
    ) -> Arc<dyn Extractor> {
        Arc::new(
            PdfExtractor::new(transcriber, Self::rasterizer(settings))
                .with_dpi(settings.dpi)
                .with_max_concurrency(settings.max_concurrent_transcriptions),
        )
    }

    /// Create a spreadsheet extractor.
    pub fn spreadsheet() -> Arc<dyn Extractor> {
        Arc::new(SpreadsheetExtractor::new())
    }

    /// Create a Word document extractor.
    pub fn docx(transcriber: Arc<VisionTranscriber>) -> Arc<dyn Extractor> {
        Arc::new(DocxExtractor::new(transcriber))
    }

    /// Create an image extractor.
    pub fn image(transcriber: Arc<VisionTranscriber>) -> Arc<dyn Extractor> {
        Arc::new(ImageExtractor::new(transcriber))
    }

    /// Create the extractor responsible for a detected format.
    pub fn for_format(
        format: DocumentFormat,
        transcriber: Arc<VisionTranscriber>,
        settings: &ExtractorSettings,
    ) -> Arc<dyn Extractor> {
        match format.family() {
            FormatFamily::Pdf => Self::pdf(transcriber, settings),
            FormatFamily::Spreadsheet => Self::spreadsheet(),
            FormatFamily::WordDocument => Self::docx(transcriber),
            FormatFamily::Image => Self::image(transcriber),
        }
    }

    /// One extractor per format family.
    pub fn all(
        transcriber: Arc<VisionTranscriber>,
        settings: &ExtractorSettings,
    ) -> Vec<Arc<dyn Extractor>> {
        vec![
            Self::pdf(transcriber.clone(), settings),
            Self::spreadsheet(),
            Self::docx(transcriber.clone()),
            Self::image(transcriber),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranscriptionResult;
    use crate::transcriber::{TranscriptionRequest, VisionModel};
    use crate::types::ImageKind;
    use async_trait::async_trait;

    struct NullModel;

    #[async_trait]
    impl VisionModel for NullModel {
        async fn complete(&self, _request: TranscriptionRequest) -> TranscriptionResult<String> {
            Ok(String::new())
        }

        fn model_name(&self) -> &str {
            "null"
        }
    }

    fn transcriber() -> Arc<VisionTranscriber> {
        Arc::new(VisionTranscriber::new(Arc::new(NullModel)))
    }

    #[test]
    fn test_factory_all_extractors() {
        let extractors = ExtractorFactory::all(transcriber(), &ExtractorSettings::default());
        assert_eq!(extractors.len(), 4);
    }

    #[test]
    fn test_for_format_routes_by_family() {
        let settings = ExtractorSettings::default();
        let cases = [
            (DocumentFormat::Pdf, "pdf"),
            (DocumentFormat::Xls, "spreadsheet"),
            (DocumentFormat::Docx, "docx"),
            (DocumentFormat::Image(ImageKind::Jpeg), "image-vision"),
        ];
        for (format, name) in cases {
            let extractor = ExtractorFactory::for_format(format, transcriber(), &settings);
            assert_eq!(extractor.name(), name);
            assert!(extractor.supports(format.mime()));
        }
    }

    #[test]
    fn test_settings_default() {
        let settings = ExtractorSettings::default();
        assert_eq!(settings.dpi, 200);
        assert_eq!(settings.max_concurrent_transcriptions, 4);
    }
}
