//! 统一的 API 错误类型与 JSON 错误响应。

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use serde::Serialize;
use std::io::ErrorKind;
use tracing::error;

use crate::audio::AudioError;
use crate::storage::StorageError;

pub const MISSING_FILENAME_MESSAGE: &str = "Please specify file name!";
pub const INVALID_FILENAME_MESSAGE: &str = "Invalid file name!";

#[derive(Debug)]
pub enum ApiError {
    MissingFilename,
    InvalidFilename,
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge(String),
    Unprocessable(String),
    Internal(String),
}

/// 错误响应体，`status_code` 与 HTTP 状态码一致。
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub status_code: u16,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFilename | ApiError::InvalidFilename | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(self) -> String {
        match self {
            ApiError::MissingFilename => MISSING_FILENAME_MESSAGE.into(),
            ApiError::InvalidFilename => INVALID_FILENAME_MESSAGE.into(),
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::Unprocessable(msg) => msg,
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal error");
                "internal server error".into()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            message: self.message(),
            status_code: status.as_u16(),
        };
        (status, JsonResponse(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidPath => ApiError::InvalidFilename,
            StorageError::Io(err) => match err.kind() {
                ErrorKind::NotFound => ApiError::NotFound("file not found".into()),
                _ => ApiError::Internal(err.to_string()),
            },
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<AudioError> for ApiError {
    fn from(error: AudioError) -> Self {
        match error {
            AudioError::NotFound => ApiError::NotFound("file not found".into()),
            AudioError::Decode(msg) => ApiError::Unprocessable(msg),
            AudioError::Io(err) => ApiError::Internal(err.to_string()),
        }
    }
}
