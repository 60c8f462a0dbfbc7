//! Core types for content extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raster image subtypes recognised by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Tiff,
}

impl ImageKind {
    /// MIME type for this image subtype.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }
}

/// Classification produced by content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "format", content = "subtype")]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML workbook.
    Xlsx,
    /// Legacy BIFF workbook.
    Xls,
    /// Office Open XML word-processing document.
    Docx,
    /// Legacy binary Word document.
    Doc,
    /// Raster image.
    Image(ImageKind),
}

/// Extractor family a format routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatFamily {
    Pdf,
    Spreadsheet,
    WordDocument,
    Image,
}

impl DocumentFormat {
    pub const MIME_PDF: &'static str = "application/pdf";
    pub const MIME_XLSX: &'static str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
    pub const MIME_XLS: &'static str = "application/vnd.ms-excel";
    pub const MIME_DOCX: &'static str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    pub const MIME_DOC: &'static str = "application/msword";

    /// MIME type used for routing.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Pdf => Self::MIME_PDF,
            Self::Xlsx => Self::MIME_XLSX,
            Self::Xls => Self::MIME_XLS,
            Self::Docx => Self::MIME_DOCX,
            Self::Doc => Self::MIME_DOC,
            Self::Image(kind) => kind.mime(),
        }
    }

    pub fn family(self) -> FormatFamily {
        match self {
            Self::Pdf => FormatFamily::Pdf,
            Self::Xlsx | Self::Xls => FormatFamily::Spreadsheet,
            Self::Docx | Self::Doc => FormatFamily::WordDocument,
            Self::Image(_) => FormatFamily::Image,
        }
    }

    /// Short label for logs and metadata.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Image(ImageKind::Png) => "png",
            Self::Image(ImageKind::Jpeg) => "jpeg",
            Self::Image(ImageKind::Gif) => "gif",
            Self::Image(ImageKind::Webp) => "webp",
            Self::Image(ImageKind::Bmp) => "bmp",
            Self::Image(ImageKind::Tiff) => "tiff",
        }
    }
}

/// How the text of a document was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Embedded PDF text layer.
    TextLayer,
    /// PDF pages rendered and transcribed by the vision model.
    VisionFallback,
    /// Structured parse of an office document.
    Structured,
    /// Standalone image transcribed by the vision model.
    Vision,
    /// Nothing could be extracted.
    None,
}

impl ExtractionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextLayer => "text_layer",
            Self::VisionFallback => "vision_fallback",
            Self::Structured => "structured",
            Self::Vision => "vision",
            Self::None => "none",
        }
    }
}

/// Document structure metadata (optional, for paged documents).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Total page count (for PDFs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,

    /// Per-page text in page order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub pages: Vec<String>,
}

/// Text extracted from one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Extracted text for embedding/search. Empty means nothing usable was found.
    pub text: String,

    /// Original upload name.
    pub filename: String,

    /// Classification the extractor was routed by.
    pub format: DocumentFormat,

    /// Strategy that produced `text`.
    pub method: ExtractionMethod,

    /// Page structure (if preserved).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<DocumentStructure>,

    /// Soft failures encountered along the way.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,

    /// Additional metadata (format-specific).
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ExtractedContent {
    /// Create new extracted content.
    pub fn new(text: String, format: DocumentFormat, method: ExtractionMethod) -> Self {
        Self {
            text,
            filename: String::new(),
            format,
            method,
            structure: None,
            warnings: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Empty result carrying the reason nothing was extracted.
    pub fn empty(format: DocumentFormat, warning: impl Into<String>) -> Self {
        Self::new(String::new(), format, ExtractionMethod::None).with_warning(warning)
    }

    /// Set the originating filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Add structure information.
    pub fn with_structure(mut self, structure: DocumentStructure) -> Self {
        self.structure = Some(structure);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Add metadata entry.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check if extraction produced meaningful content.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Get content length.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Number of pages, when the format has pages.
    pub fn page_count(&self) -> Option<usize> {
        self.structure.as_ref().and_then(|s| s.page_count)
    }
}

/// A file received from a user, before extraction.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Raw content.
    pub bytes: Vec<u8>,
    /// Original filename as provided by the client.
    pub filename: String,
    /// MIME type declared by the client. Informational only; routing sniffs content.
    pub declared_mime: Option<String>,
}

impl UploadedFile {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            declared_mime: None,
        }
    }

    pub fn with_declared_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }
}

/// Per-call inputs read from the current settings.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    /// Instruction sent with every vision transcription.
    pub instruction_prompt: String,
}

impl ExtractionContext {
    pub fn new(instruction_prompt: impl Into<String>) -> Self {
        Self {
            instruction_prompt: instruction_prompt.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_families() {
        assert_eq!(DocumentFormat::Pdf.family(), FormatFamily::Pdf);
        assert_eq!(DocumentFormat::Xls.family(), FormatFamily::Spreadsheet);
        assert_eq!(DocumentFormat::Doc.family(), FormatFamily::WordDocument);
        assert_eq!(
            DocumentFormat::Image(ImageKind::Webp).family(),
            FormatFamily::Image
        );
    }

    #[test]
    fn test_image_mime_prefix() {
        for kind in [ImageKind::Png, ImageKind::Jpeg, ImageKind::Tiff] {
            assert!(DocumentFormat::Image(kind).mime().starts_with("image/"));
        }
    }

    #[test]
    fn test_empty_content_carries_warning() {
        let content = ExtractedContent::empty(DocumentFormat::Docx, "no text");
        assert!(content.is_empty());
        assert_eq!(content.method, ExtractionMethod::None);
        assert_eq!(content.warnings, vec!["no text".to_string()]);
    }

    #[test]
    fn test_whitespace_is_empty() {
        let content =
            ExtractedContent::new(" \n\t".into(), DocumentFormat::Pdf, ExtractionMethod::TextLayer);
        assert!(content.is_empty());
    }
}
