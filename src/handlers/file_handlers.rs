//! HTTP handlers for the file explorer API.
//! Streams object bodies in both directions to avoid buffering in memory and
//! delegates namespace and trash concerns to `ArchiveService`.

use crate::{
    errors::AppError,
    models::entry::FileEntry,
    services::{AppState, archive_service::BatchDeleteOutcome},
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, header},
    response::Response,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io;
use tokio_util::io::StreamReader;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub path: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub path: String,
    pub files: Vec<FileEntry>,
}

#[derive(Serialize)]
pub struct WriteResponse {
    pub success: bool,
    pub path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub path: String,
    pub trashed_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub paths: Vec<String>,
}

#[derive(Serialize)]
pub struct BatchDeleteResponse {
    pub results: Vec<BatchDeleteOutcome>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub success: bool,
    pub trash_key: String,
    pub path: String,
}

/// GET `/api/files?path=some/folder` — list one directory level.
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let path = query.path.unwrap_or_default();
    let files = state.archive.list_directory(&path).await?;
    Ok(Json(ListResponse { path, files }))
}

/// GET `/api/files/{*path}` — stream an object's bytes out.
pub async fn get_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let object = state.archive.read_file(&path).await?;
    let filename = path.rsplit('/').next().unwrap_or(path.as_str());

    let mut response = Response::new(Body::from_stream(object.bytes));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&object.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&object.size.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("inline; filename=\"{filename}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// PUT `/api/files/{*path}` — upload or overwrite an object.
///
/// The request body is streamed straight into the store; the content type
/// falls back to the filename extension when the header is absent.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<WriteResponse>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));
    let mut reader = StreamReader::new(stream);

    state
        .archive
        .write_file_stream(&path, &mut reader, content_type.as_deref())
        .await?;

    Ok(Json(WriteResponse {
        success: true,
        path,
    }))
}

/// PATCH `/api/files/{*path}` — replace a text object's content.
pub async fn patch_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<WriteResponse>, AppError> {
    let content = payload
        .get("content")
        .and_then(|value| value.as_str())
        .ok_or_else(|| AppError::bad_request("`content` must be a string"))?;

    state.archive.update_text(&path, content.to_string()).await?;

    Ok(Json(WriteResponse {
        success: true,
        path,
    }))
}

/// DELETE `/api/files/{*path}` — move an object to trash.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state.archive.soft_delete(&path).await?;
    Ok(Json(DeleteResponse {
        success: true,
        path: deleted.path,
        trashed_at: deleted.trashed_at,
    }))
}

/// DELETE `/api/files` — best-effort batch trash with per-key results.
pub async fn delete_files(
    State(state): State<AppState>,
    Json(request): Json<BatchDeleteRequest>,
) -> Result<Json<BatchDeleteResponse>, AppError> {
    if request.paths.is_empty() {
        return Err(AppError::bad_request("`paths` must not be empty"));
    }
    let results = state.archive.soft_delete_many(&request.paths).await;
    Ok(Json(BatchDeleteResponse { results }))
}

/// POST `/api/restore/{*path}` — copy a trashed object back to its original
/// key.
pub async fn restore_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<RestoreResponse>, AppError> {
    let restored = state.archive.restore(&path).await?;
    Ok(Json(RestoreResponse {
        success: true,
        trash_key: restored.trash_key,
        path: restored.path,
    }))
}
