//! Artifact download and service health handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/files/{name}
///
/// Streams a merged artifact. Artifact names never contain path
/// separators, so the store's key validation is the only gate needed.
pub async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let stream = state.store.get_artifact(&name).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    if let Ok(disposition) = HeaderValue::from_str(&format!("attachment; filename=\"{name}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}

/// GET /api/health
///
/// Verifies the storage backend is reachable and writable.
pub async fn health(State(state): State<AppState>) -> ApiResult<ApiResponse<&'static str>> {
    state
        .store
        .health_check()
        .await
        .map_err(|e| ApiError::Internal(format!("storage unhealthy: {e}")))?;
    Ok(ApiResponse::ok("ok"))
}
