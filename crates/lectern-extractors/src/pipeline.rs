//! Extraction pipeline: detect, route, extract.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::detect::detect_format;
use crate::error::{ExtractError, ExtractResult};
use crate::factory::{ExtractorFactory, ExtractorSettings};
use crate::transcriber::VisionTranscriber;
use crate::types::{ExtractedContent, ExtractionContext, UploadedFile};
use crate::Extractor;

/// Pipeline for extracting content using registered extractors.
///
/// Content is classified by sniffing its bytes; the first registered
/// extractor supporting the detected MIME type handles it.
pub struct ExtractionPipeline {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractionPipeline {
    /// Create new empty pipeline.
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Create pipeline with all available extractors.
    pub fn with_defaults(transcriber: Arc<VisionTranscriber>) -> Self {
        Self::with_settings(transcriber, &ExtractorSettings::default())
    }

    pub fn with_settings(
        transcriber: Arc<VisionTranscriber>,
        settings: &ExtractorSettings,
    ) -> Self {
        Self {
            extractors: ExtractorFactory::all(transcriber, settings),
        }
    }

    /// Add an extractor to the pipeline.
    pub fn add_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Extract text from in-memory content.
    ///
    /// Unsupported content fails before any extractor runs. A result with
    /// empty text always carries at least one warning.
    pub async fn extract(
        &self,
        content: &[u8],
        filename: &str,
        ctx: &ExtractionContext,
    ) -> ExtractResult<ExtractedContent> {
        let format = detect_format(content)?;
        let mime = format.mime();

        let extractor = self
            .extractors
            .iter()
            .find(|e| e.supports(mime))
            .ok_or_else(|| ExtractError::UnsupportedFormat {
                mime: mime.to_string(),
            })?;

        debug!(
            filename,
            format = format.label(),
            extractor = extractor.name(),
            bytes = content.len(),
            "Routing file to extractor"
        );

        let mut extracted = extractor.extract(content, ctx).await?;
        extracted.filename = filename.to_string();
        extracted.format = format;

        if extracted.is_empty() {
            if extracted.warnings.is_empty() {
                extracted.warnings.push("no text could be extracted".to_string());
            }
            warn!(
                filename,
                format = format.label(),
                warnings = ?extracted.warnings,
                "Extraction produced no text"
            );
        } else {
            info!(
                filename,
                format = format.label(),
                method = extracted.method.as_str(),
                chars = extracted.len(),
                "Extraction complete"
            );
        }

        Ok(extracted)
    }

    /// Extract text from a file on disk. The file name is never used for routing.
    pub async fn extract_file(
        &self,
        path: &Path,
        filename: &str,
        ctx: &ExtractionContext,
    ) -> ExtractResult<ExtractedContent> {
        let content = tokio::fs::read(path).await?;
        self.extract(&content, filename, ctx).await
    }

    /// Stage an upload in a scratch file, extract it, and remove the file.
    pub async fn extract_upload(
        &self,
        upload: UploadedFile,
        ctx: &ExtractionContext,
    ) -> ExtractResult<ExtractedContent> {
        let UploadedFile {
            bytes,
            filename,
            declared_mime,
        } = upload;

        if let Some(declared) = &declared_mime {
            debug!(filename = %filename, declared = %declared, "Ignoring declared MIME type");
        }

        let scratch = stage(bytes).await?;
        debug!(filename = %filename, path = %scratch.path().display(), "Upload staged");
        let result = self.extract_file(scratch.path(), &filename, ctx).await;

        if let Err(e) = scratch.close() {
            warn!(filename = %filename, error = %e, "Failed to remove scratch file");
        }

        result
    }

    /// Check if pipeline can handle a given MIME type.
    pub fn supports(&self, mime_type: &str) -> bool {
        self.extractors.iter().any(|e| e.supports(mime_type))
    }

    /// List all supported MIME types.
    pub fn supported_types(&self) -> Vec<&str> {
        self.extractors
            .iter()
            .flat_map(|e| e.supported_types().iter().copied())
            .collect()
    }

    /// Get the number of registered extractors.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Check if the pipeline has no registered extractors.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

/// Write upload bytes into a scratch file that is deleted on drop.
async fn stage(bytes: Vec<u8>) -> ExtractResult<tempfile::NamedTempFile> {
    let file = tokio::task::spawn_blocking(move || {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok::<_, std::io::Error>(file)
    })
    .await??;
    Ok(file)
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new()
    }
}
