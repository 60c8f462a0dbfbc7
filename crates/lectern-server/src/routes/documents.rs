//! Document upload endpoint.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::debug;

use lectern_core::ingest::IngestOutcome;
use lectern_extractors::UploadedFile;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Response for an upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// `indexed` or `empty`.
    pub status: String,
    pub filename: String,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub chunks: usize,
    pub characters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<IngestOutcome> for UploadResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Indexed {
                filename,
                format,
                method,
                chunks,
                characters,
            } => Self {
                status: "indexed".to_string(),
                filename,
                format,
                method: Some(method),
                chunks,
                characters,
                warning: None,
            },
            IngestOutcome::Empty {
                filename,
                format,
                warning,
            } => Self {
                status: "empty".to_string(),
                filename,
                format,
                method: None,
                chunks: 0,
                characters: 0,
                warning: Some(warning),
            },
        }
    }
}

/// Read the `file` field of a multipart form.
async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("upload")
            .to_string();
        let declared = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;

        debug!(filename = %filename, bytes = bytes.len(), "Upload received");
        let mut upload = UploadedFile::new(bytes.to_vec(), filename);
        if let Some(mime) = declared {
            upload = upload.with_declared_mime(mime);
        }
        return Ok(upload);
    }

    Err(ApiError::missing_field(FILE_FIELD))
}

/// Extract and index an uploaded document.
/// POST /documents
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let upload = read_upload(multipart).await?;
    let prompts = state.prompts.snapshot().await;
    let outcome = state.ingester.ingest_upload(upload, &prompts).await?;
    Ok(Json(outcome.into()))
}
