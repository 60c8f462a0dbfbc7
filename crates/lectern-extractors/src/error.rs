//! Extraction error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during content extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Content sniffing did not recognise a supported format.
    #[error("Unsupported format: {mime}")]
    UnsupportedFormat {
        /// Best-effort MIME type of the rejected content.
        mime: String,
    },

    /// Format-specific parse failure.
    #[error("{format} extraction failed: {reason}")]
    ExtractionFailed {
        /// Label of the format being parsed.
        format: &'static str,
        /// Parser message.
        reason: String,
    },

    /// Vision transcription of the file's content failed.
    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    /// Missing or invalid extractor configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error during extraction.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ExtractError {
    pub(crate) fn failed(format: &'static str, reason: impl ToString) -> Self {
        Self::ExtractionFailed {
            format,
            reason: reason.to_string(),
        }
    }

    /// True when the caller may skip this failure and keep going.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::ExtractionFailed { .. })
    }
}

/// Errors raised by a single vision transcription call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    /// Transport-level failure reaching the model API.
    #[error("network error: {0}")]
    Network(String),

    /// The call did not complete within the configured bound.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The API answered with an error (bad request, auth, quota, ...).
    #[error("rejected by API: {0}")]
    Rejected(String),

    /// The API answered without any text.
    #[error("empty response from vision model")]
    EmptyResponse,

    /// The image could not be encoded for upload.
    #[error("image encoding failed: {0}")]
    Encode(String),
}

impl TranscriptionError {
    /// Network and timeout failures, as opposed to API rejections.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for transcription calls.
pub type TranscriptionResult<T> = Result<T, TranscriptionError>;
