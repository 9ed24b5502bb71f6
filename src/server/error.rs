//! HTTP error mapping.
//!
//! Every error leaves the service as JSON with an `error` key. Internal
//! failures are logged in full before the response is built.

use crate::error::Doc2MdError;
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    UnsupportedMediaType {
        message: String,
        mime_type: Option<String>,
    },

    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::UnsupportedMediaType { message, mime_type } => {
                json!({ "error": message, "mime_type": mime_type })
            }
            ApiError::BadRequest(message) => json!({ "error": message }),
            ApiError::InternalError(message) => {
                tracing::error!(error = %message, "Request failed");
                json!({ "error": message })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<Doc2MdError> for ApiError {
    fn from(err: Doc2MdError) -> Self {
        match err {
            Doc2MdError::NoFileProvided(message) => ApiError::BadRequest(message),
            Doc2MdError::UnsupportedType { ref mime_type, .. } => ApiError::UnsupportedMediaType {
                mime_type: mime_type.clone(),
                message: err.to_string(),
            },
            Doc2MdError::SizeLimitExceeded { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::InternalError(format!("Failed to convert file: {other}")),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Multipart parse error: {err}"))
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc2md_errors_map_to_statuses() {
        let e: ApiError = Doc2MdError::NoFileProvided("No selected file".into()).into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "No selected file");

        let e: ApiError = Doc2MdError::SizeLimitExceeded { limit: 10, actual: 11 }.into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);

        let e: ApiError = Doc2MdError::UnsupportedType {
            filename: "a.xyz".into(),
            mime_type: Some("application/x-foo".into()),
        }
        .into();
        assert_eq!(e.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let e: ApiError = Doc2MdError::Internal("boom".into()).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.to_string().starts_with("Failed to convert file: "));
    }

    #[test]
    fn staging_failure_is_internal() {
        let e: ApiError = Doc2MdError::StagingFailed {
            source: std::io::Error::other("disk full"),
        }
        .into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.to_string().contains("disk full"));
    }
}
