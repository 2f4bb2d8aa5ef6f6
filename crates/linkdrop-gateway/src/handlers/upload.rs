use crate::error::Result;
use crate::model::{
    DataResponse, FileData, FileStatsData, MessageResponse, StatsResponse, UploadResponse,
};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use linkdrop_core::FileId;
use linkdrop_upload::policy::MAX_TRANSPORT_FILE_BYTES;
use linkdrop_upload::{IncomingFile, UploadError};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::user_agent;

/// Multipart field carrying the uploaded files.
pub const FILES_FIELD: &str = "files";

pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let max_files = state.uploads.settings().max_files;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(name) = field.file_name().filter(|n| !n.is_empty()).map(str::to_string) else {
            continue;
        };
        if files.len() == max_files {
            return Err(UploadError::TooManyFiles {
                count: files.len() + 1,
                max: max_files,
            }
            .into());
        }
        let content_type = field.content_type().map(str::to_string);
        let data = read_field(field, &name).await?;
        debug!(filename = %name, size = data.len(), "received file");
        files.push(IncomingFile::new(name, content_type, data));
    }

    let base_url = state.base_url(&headers);
    let records = state.uploads.upload(files, user_agent(&headers)).await?;
    let files: Vec<_> = records
        .into_iter()
        .map(|record| FileData::new(record, &base_url))
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            message: format!("{} file(s) uploaded successfully", files.len()),
            files,
        }),
    ))
}

async fn read_field(mut field: Field<'_>, filename: &str) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if (data.len() + chunk.len()) as u64 > MAX_TRANSPORT_FILE_BYTES {
            return Err(UploadError::PayloadTooLarge {
                filename: filename.to_string(),
                limit: MAX_TRANSPORT_FILE_BYTES,
            }
            .into());
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Streams a stored file back as an attachment under its original name.
pub async fn download_handler(
    Path(file_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let id = parse_file_id(&file_id)?;
    let record = state.uploads.download(&id).await?;

    let file = tokio::fs::File::open(&record.path)
        .await
        .map_err(UploadError::from)?;
    let length = file.metadata().await.map_err(UploadError::from)?.len();

    let headers = [
        (header::CONTENT_TYPE, record.mimetype.clone()),
        (header::CONTENT_LENGTH, length.to_string()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(&record.original_name),
        ),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

pub async fn file_info_handler(
    Path(file_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DataResponse<FileData>>> {
    let id = parse_file_id(&file_id)?;
    let record = state.uploads.info(&id).await?;
    Ok(Json(DataResponse::ok(FileData::new(
        record,
        &state.base_url(&headers),
    ))))
}

pub async fn file_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse<FileStatsData>>> {
    let stats = state.uploads.stats().await?;
    Ok(Json(StatsResponse::ok(stats.into())))
}

pub async fn delete_file_handler(
    Path(file_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>> {
    let id = parse_file_id(&file_id)?;
    let record = state.uploads.delete(&id).await?;
    Ok(Json(MessageResponse::ok(format!(
        "{} deleted",
        record.original_name
    ))))
}

fn parse_file_id(file_id: &str) -> Result<FileId> {
    FileId::parse(file_id).map_err(|_| UploadError::NotFound(file_id.to_string()).into())
}

/// Header value with an ASCII-only quoted filename.
fn content_disposition(original_name: &str) -> String {
    let fallback: String = original_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{fallback}\"")
}
