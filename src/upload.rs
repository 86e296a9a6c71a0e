//! 上传处理器：multipart 字段 `file` 写入存储目录。

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Extension, Multipart};
use axum::http::StatusCode;
use axum::response::Json as JsonResponse;
use serde::Serialize;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::filename::{AllowList, sanitize_filename};
use crate::locking::LockManager;
use crate::storage::Storage;

pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
}

/// 接收上传文件，校验并清洗文件名后原子地覆盖写入。
pub async fn upload_file(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(allow_list): Extension<Arc<AllowList>>,
    Extension(lock_manager): Extension<Arc<LockManager>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    let mut multipart = multipart?;
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if !allow_list.is_allowed(&original) {
            warn!(filename = original, "rejected upload name");
            return Err(ApiError::InvalidFilename);
        }
        let filename = sanitize_filename(&original)
            .filter(|name| allow_list.is_allowed(name))
            .ok_or(ApiError::InvalidFilename)?;
        if filename != original {
            debug!(original, filename, "sanitized upload name");
        }

        let _guard = lock_manager
            .lock_name(&filename)
            .await
            .map_err(|_| ApiError::Conflict("file is being written".into()))?;
        let mut atomic = storage.begin_write(&filename).await?;
        let size = match write_field(&mut field, atomic.file_mut()).await {
            Ok(size) => size,
            Err(err) => {
                atomic.cleanup().await;
                return Err(err);
            }
        };
        atomic
            .finalize()
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;

        info!(filename, size, "upload complete");
        return Ok(JsonResponse(UploadResponse { filename }));
    }

    Err(ApiError::BadRequest("No file part!".into()))
}

async fn write_field(field: &mut Field<'_>, file: &mut File) -> Result<u64, ApiError> {
    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk)
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        written += chunk.len() as u64;
    }
    Ok(written)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
