//! lectern-extractors - Text extraction for document ingestion.
//!
//! Turns uploaded PDF, Word, Excel, and image files into plain text with a
//! unified trait-based interface. Files without machine-readable text are
//! transcribed by a vision-capable chat model.
//!
//! # Features
//!
//! - `pdfium` (default) - render scanned PDF pages via pdfium for vision transcription
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lectern_extractors::{
//!     ExtractionContext, ExtractionPipeline, OpenAiVision, UploadedFile, VisionTranscriber,
//! };
//!
//! let vision = OpenAiVision::from_env()?;
//! let transcriber = Arc::new(VisionTranscriber::new(Arc::new(vision)));
//! let pipeline = ExtractionPipeline::with_defaults(transcriber);
//!
//! let ctx = ExtractionContext::new("Split the image content into items and data");
//! let upload = UploadedFile::new(bytes, "invoice.pdf");
//! let content = pipeline.extract_upload(upload, &ctx).await?;
//! ```

mod error;
mod factory;
mod pipeline;
mod types;

pub mod detect;
pub mod docx;
pub mod image;
pub mod pdf;
pub mod spreadsheet;
pub mod transcriber;
pub mod vision;

pub use detect::{detect_file, detect_format};
pub use docx::DocxExtractor;
pub use error::{ExtractError, ExtractResult, TranscriptionError, TranscriptionResult};
pub use factory::{ExtractorFactory, ExtractorSettings};
pub use image::ImageExtractor;
pub use pdf::{PageRasterizer, PdfExtractor};
pub use pipeline::ExtractionPipeline;
pub use spreadsheet::SpreadsheetExtractor;
pub use transcriber::{TranscriptionRequest, VisionModel, VisionTranscriber};
pub use types::{
    DocumentFormat, DocumentStructure, ExtractedContent, ExtractionContext, ExtractionMethod,
    FormatFamily, ImageKind, UploadedFile,
};
pub use vision::{OpenAiVision, VisionConfig};

#[cfg(feature = "pdfium")]
pub use pdf::PdfiumRasterizer;

use async_trait::async_trait;

/// Core Extractor trait - all format extractors implement this.
///
/// Similar pattern to the Embedder/Llm traits in lectern-core.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract text content from bytes.
    ///
    /// Soft failures (unparseable input) resolve to an empty
    /// [`ExtractedContent`] with a warning; only errors that make the whole
    /// file unusable are returned as `Err`.
    async fn extract(
        &self,
        content: &[u8],
        ctx: &ExtractionContext,
    ) -> ExtractResult<ExtractedContent>;

    /// Supported MIME types for this extractor.
    fn supported_types(&self) -> &[&str];

    /// Check if this extractor handles the given MIME type.
    fn supports(&self, mime_type: &str) -> bool {
        self.supported_types().contains(&mime_type)
    }

    /// Human-readable name for this extractor.
    fn name(&self) -> &str;
}
