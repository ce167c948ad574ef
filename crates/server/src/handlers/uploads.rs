//! HTTP handlers for the chunked upload API.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use bytes::Bytes;
use stitch_core::{FileId, MergeRequest};

use crate::coordinator::{ChunkUpload, SessionStatus};
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/upload/chunk/{file_id}/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<ApiResponse<SessionStatus>> {
    let file_id = FileId::parse(&file_id)?;
    let status = state.coordinator.status(&file_id).await?;
    Ok(ApiResponse::ok(status))
}

/// POST /api/upload/chunk
///
/// Multipart form with a binary `file` part and text parts `fileId`,
/// `chunkIndex`, `totalChunks`, `fileName`, `fileSize`, `fileType`.
pub async fn upload_chunk(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ApiResponse<bool>> {
    let upload = parse_chunk_form(multipart).await?;
    state.coordinator.upload_chunk(upload).await?;
    Ok(ApiResponse::ok(true))
}

/// POST /api/upload/chunk/merge
pub async fn merge(
    State(state): State<AppState>,
    Json(request): Json<MergeRequest>,
) -> ApiResult<ApiResponse<String>> {
    let url = state
        .coordinator
        .merge(&request.file_id, &request.file_name)
        .await?;
    Ok(ApiResponse::ok(url))
}

/// DELETE /api/upload/chunk/{file_id}
pub async fn cleanup(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<ApiResponse<bool>> {
    let file_id = FileId::parse(&file_id)?;
    state.coordinator.cleanup(&file_id).await?;
    Ok(ApiResponse::ok(true))
}

/// Collect the multipart form into a [`ChunkUpload`], rejecting
/// missing or malformed fields with a 400.
async fn parse_chunk_form(mut multipart: Multipart) -> ApiResult<ChunkUpload> {
    let mut data: Option<Bytes> = None;
    let mut file_id: Option<FileId> = None;
    let mut chunk_index: Option<u32> = None;
    let mut total_chunks: Option<u32> = None;
    let mut file_name: Option<String> = None;
    let mut file_size: Option<u64> = None;
    let mut file_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read chunk: {e}")))?;
                data = Some(bytes);
            }
            "fileId" => {
                let text = read_text(field, "fileId").await?;
                file_id = Some(FileId::parse(&text)?);
            }
            "chunkIndex" => {
                chunk_index = Some(parse_number(read_text(field, "chunkIndex").await?, "chunkIndex")?);
            }
            "totalChunks" => {
                total_chunks =
                    Some(parse_number(read_text(field, "totalChunks").await?, "totalChunks")?);
            }
            "fileName" => {
                file_name = Some(read_text(field, "fileName").await?);
            }
            "fileSize" => {
                file_size = Some(parse_number(read_text(field, "fileSize").await?, "fileSize")?);
            }
            "fileType" => {
                file_type = Some(read_text(field, "fileType").await?);
            }
            // Unknown parts are ignored so clients can evolve.
            _ => {}
        }
    }

    Ok(ChunkUpload {
        file_id: required(file_id, "fileId")?,
        chunk_index: required(chunk_index, "chunkIndex")?,
        total_chunks: required(total_chunks, "totalChunks")?,
        file_name: required(file_name, "fileName")?,
        file_size: required(file_size, "fileSize")?,
        file_type: file_type.unwrap_or_default(),
        data: required(data, "file")?,
    })
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read field {name}: {e}")))
}

fn parse_number<T: std::str::FromStr>(text: String, name: &str) -> ApiResult<T> {
    text.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("field {name} is not a valid number: {text:?}")))
}

fn required<T>(value: Option<T>, name: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::BadRequest(format!("missing required field {name}")))
}
