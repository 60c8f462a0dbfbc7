//! Upload ingestion: extract, then index.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use lectern_extractors::{
    DocumentFormat, ExtractionContext, ExtractionMethod, ExtractionPipeline, UploadedFile,
};

use crate::config::Prompts;
use crate::error::LecternResult;
use crate::index::IngestionSink;
use crate::types::Document;

/// Result of ingesting one upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Text was extracted and stored.
    Indexed {
        filename: String,
        format: String,
        method: String,
        chunks: usize,
        characters: usize,
    },
    /// Nothing could be extracted; the sink was not called.
    Empty {
        filename: String,
        format: String,
        warning: String,
    },
}

impl IngestOutcome {
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed { .. })
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::Indexed { filename, .. } | Self::Empty { filename, .. } => filename,
        }
    }
}

fn format_name(format: DocumentFormat) -> String {
    format.label().to_string()
}

fn method_name(method: ExtractionMethod) -> String {
    method.as_str().to_string()
}

/// Runs the extraction pipeline and hands non-empty results to the sink.
pub struct DocumentIngester {
    pipeline: Arc<ExtractionPipeline>,
    sink: Arc<dyn IngestionSink>,
}

impl DocumentIngester {
    pub fn new(pipeline: Arc<ExtractionPipeline>, sink: Arc<dyn IngestionSink>) -> Self {
        Self { pipeline, sink }
    }

    /// Extract an upload and index its text as one document.
    ///
    /// `prompts` is read once here; later settings changes do not affect
    /// this upload.
    pub async fn ingest_upload(
        &self,
        upload: UploadedFile,
        prompts: &Prompts,
    ) -> LecternResult<IngestOutcome> {
        let filename = upload.filename.clone();
        let ctx = ExtractionContext::new(prompts.instruction_prompt.clone());
        let extracted = self.pipeline.extract_upload(upload, &ctx).await?;

        if extracted.is_empty() {
            let warning = extracted.warnings.join("; ");
            warn!(filename = %filename, warning = %warning, "Nothing to index");
            return Ok(IngestOutcome::Empty {
                filename,
                format: format_name(extracted.format),
                warning,
            });
        }

        let characters = extracted.text.chars().count();
        let format = format_name(extracted.format);
        let method = method_name(extracted.method);

        let mut document = Document::new(extracted.text, filename.clone())
            .with_metadata("format", format.clone())
            .with_metadata("extraction_method", method.clone());
        if let Some(pages) = extracted.structure.as_ref().and_then(|s| s.page_count) {
            document = document.with_metadata("page_count", pages);
        }

        let chunks = self.sink.insert_document(document).await?;
        info!(filename = %filename, format = %format, method = %method, chunks, "Upload ingested");

        Ok(IngestOutcome::Indexed {
            filename,
            format,
            method,
            chunks,
            characters,
        })
    }
}
