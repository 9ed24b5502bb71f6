//! Request handlers.

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::convert::NO_SELECTED_FILE;
use crate::error::Doc2MdError;
use crate::output::{ConversionFailure, FileOutcome, SingleFileResponse};
use crate::upload::UploadedFile;
use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    Json,
};
use bytes::{Bytes, BytesMut};
use serde_json::{json, Value};
use tracing::{debug, info};

pub const NO_FILE_PART: &str = "No file part in the request";
pub const NO_FILES: &str = "Please upload files in the request";

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /convert`: one file in the `file` field.
pub async fn convert_single(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<SingleFileResponse>> {
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "Request is not multipart");
        ApiError::BadRequest(NO_FILE_PART.to_string())
    })?;

    let mut upload = None;
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(ApiError::BadRequest(NO_SELECTED_FILE.to_string()));
        }
        let content = match buffer_field(&mut field, state.upload_limit()).await? {
            Buffered::Complete(content) => content,
            Buffered::TooLarge { limit, actual } => {
                return Err(Doc2MdError::SizeLimitExceeded { limit, actual }.into())
            }
        };
        upload = Some(UploadedFile::new(name, content));
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest(NO_FILE_PART.to_string()))?;
    info!(filename = %upload.name, size = upload.len(), "Received upload");
    let result = state.converter.convert_upload(&upload).await?;
    Ok(Json(result.into()))
}

/// `POST /api/convert`: every part carrying a file name is converted.
///
/// Always answers with one record per file, failed files included.
pub async fn convert_batch(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Vec<FileOutcome>>> {
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "Request is not multipart");
        ApiError::BadRequest(NO_FILES.to_string())
    })?;

    let per_file = state.converter.config().max_file_size;
    let limit = state.upload_limit().min(per_file);

    // Files rejected while streaming keep their slot; the rest are converted.
    let mut slots: Vec<Option<FileOutcome>> = Vec::new();
    let mut uploads = Vec::new();
    while let Some(mut field) = multipart.next_field().await? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        match buffer_field(&mut field, limit).await? {
            Buffered::Complete(content) => {
                slots.push(None);
                uploads.push(UploadedFile::new(name, content));
            }
            Buffered::TooLarge { actual, .. } => {
                if let Some(ceiling) = state.max_upload_bytes.filter(|&c| actual > c) {
                    return Err(Doc2MdError::SizeLimitExceeded {
                        limit: ceiling,
                        actual,
                    }
                    .into());
                }
                let error = Doc2MdError::SizeLimitExceeded {
                    limit: per_file,
                    actual,
                };
                debug!(filename = %name, "Upload over the per-file limit");
                slots.push(Some(FileOutcome::Failed(ConversionFailure {
                    filename: name,
                    error: error.to_string(),
                })));
            }
        }
    }

    if slots.is_empty() {
        return Err(ApiError::BadRequest(NO_FILES.to_string()));
    }
    info!(files = slots.len(), "Received batch");
    let mut converted = state.converter.convert_many(uploads).await.into_iter();
    let outcomes = slots
        .into_iter()
        .filter_map(|slot| slot.or_else(|| converted.next()))
        .collect();
    Ok(Json(outcomes))
}

enum Buffered {
    Complete(Bytes),
    /// Reading stopped once `actual` bytes passed `limit`.
    TooLarge { limit: u64, actual: u64 },
}

/// Buffer one multipart field, stopping as soon as it passes `limit`.
async fn buffer_field(field: &mut Field<'_>, limit: u64) -> Result<Buffered, MultipartError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        let actual = (buf.len() + chunk.len()) as u64;
        if actual > limit {
            return Ok(Buffered::TooLarge { limit, actual });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Buffered::Complete(buf.freeze()))
}
