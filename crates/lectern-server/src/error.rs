//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use lectern_core::error::{ErrorCode, LecternError};

/// API error type.
#[derive(Debug, thiserror::Error)]
#[error("[{status}] {code}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::ValInvalidInput.as_str(), message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::ValMissingField.as_str(),
            format!("Missing required field: {field}"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal.as_str(), message)
    }
}

/// HTTP status for a core error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValInvalidInput | ErrorCode::ValMissingField => StatusCode::BAD_REQUEST,
        ErrorCode::ExtUnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorCode::ExtFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::ExtTranscriptionTransport
        | ErrorCode::ExtTranscriptionRejected
        | ErrorCode::LlmConnectionFailed
        | ErrorCode::LlmGenerationFailed
        | ErrorCode::LlmInvalidResponse
        | ErrorCode::EmbConnectionFailed
        | ErrorCode::EmbGenerationFailed => StatusCode::BAD_GATEWAY,
        ErrorCode::VecConnectionFailed | ErrorCode::DbConnectionFailed => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorCode::VecOperationFailed
        | ErrorCode::DbOperationFailed
        | ErrorCode::ParseInvalidJson
        | ErrorCode::ParseMissingField
        | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, code = %self.code, message = %self.message, "Request failed");
        } else {
            warn!(status = %self.status, code = %self.code, message = %self.message, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                suggestion: self.suggestion,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

// Convert from lectern-core errors
impl From<LecternError> for ApiError {
    fn from(err: LecternError) -> Self {
        let code = err.code();
        let status = match &err {
            LecternError::UnsupportedProvider { .. } => StatusCode::BAD_REQUEST,
            _ => status_for(code),
        };
        let mut api = ApiError::new(status, code.as_str(), err.to_string());
        if let Some(suggestion) = err.suggestion() {
            api = api.with_suggestion(suggestion);
        }
        api
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
