//! 文件列表、元数据与下载处理器。

use axum::body::Body as AxumBody;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Extension, Query};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use httpdate::fmt_http_date;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::audio::{AudioInfo, MetadataReader, read_info};
use crate::error::ApiError;
use crate::filename::AllowList;
use crate::storage::Storage;

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    maxduration: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct NameQuery {
    name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileList {
    pub files: Vec<String>,
}

/// 列出时长不超过 `maxduration` 的文件；无法解析的文件被跳过。
pub async fn list_files(
    query: Result<Query<ListQuery>, QueryRejection>,
    Extension(storage): Extension<Arc<Storage>>,
    Extension(allow_list): Extension<Arc<AllowList>>,
    Extension(reader): Extension<Arc<dyn MetadataReader>>,
) -> Result<JsonResponse<FileList>, ApiError> {
    let Query(query) = query?;
    let max_duration = parse_max_duration(query.maxduration.as_deref());
    let mut files = Vec::new();

    for name in storage.list_files().await? {
        if !allow_list.is_allowed(&name) {
            continue;
        }
        let path = storage.root_path().join(&name);
        match read_info(reader.clone(), path).await {
            Ok(audio) if audio.duration <= max_duration => files.push(name),
            Ok(_) => {}
            Err(err) => warn!(name, error = ?err, "skip unreadable audio file"),
        }
    }

    info!(max_duration, count = files.len(), "list files");
    Ok(JsonResponse(FileList { files }))
}

/// 返回单个文件的时长、声道数、采样率与标签。
pub async fn file_info(
    query: Result<Query<NameQuery>, QueryRejection>,
    Extension(storage): Extension<Arc<Storage>>,
    Extension(allow_list): Extension<Arc<AllowList>>,
    Extension(reader): Extension<Arc<dyn MetadataReader>>,
) -> Result<JsonResponse<AudioInfo>, ApiError> {
    let Query(query) = query?;
    let name = require_name(query, &allow_list)?;
    let path = storage.existing_file(&name).await?;
    let audio = read_info(reader, path).await?;
    info!(name, duration = audio.duration, "file info");
    Ok(JsonResponse(audio))
}

/// 以附件形式下载文件。
pub async fn download_file(
    query: Result<Query<NameQuery>, QueryRejection>,
    Extension(storage): Extension<Arc<Storage>>,
    Extension(allow_list): Extension<Arc<AllowList>>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let name = require_name(query, &allow_list)?;
    let (file, metadata) = storage.open_file(&name).await?;
    let file_size = metadata.len();
    let mime = mime_guess::from_path(&name).first_or_octet_stream();

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("无效的 MIME 类型".into()))?,
    );
    response_headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&file_size.to_string())
            .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
    );
    response_headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&name))
            .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
    );
    if let Ok(modified) = metadata.modified() {
        response_headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&fmt_http_date(modified))
                .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
        );
    }

    info!(name, size = file_size, "download file");
    let stream = ReaderStream::new(file);
    Ok((
        StatusCode::OK,
        response_headers,
        AxumBody::from_stream(stream),
    )
        .into_response())
}

/// 缺省或无法解析时不做限制。
fn parse_max_duration(value: Option<&str>) -> f64 {
    value
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(f64::INFINITY)
}

fn require_name(query: NameQuery, allow_list: &AllowList) -> Result<String, ApiError> {
    let name = query.name.unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::MissingFilename);
    }
    if !allow_list.is_allowed(&name) {
        return Err(ApiError::InvalidFilename);
    }
    Ok(name)
}

fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(name, NON_ALPHANUMERIC);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
