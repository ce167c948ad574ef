//! Route table.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{files, uploads};
use crate::metrics;
use crate::state::AppState;

/// Headroom for multipart framing and the text fields that ride along
/// with each chunk.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_chunk_size as usize + MULTIPART_OVERHEAD;

    let mut router = Router::new()
        .route("/api/upload/chunk", post(uploads::upload_chunk))
        .route("/api/upload/chunk/merge", post(uploads::merge))
        .route("/api/upload/chunk/{file_id}/status", get(uploads::get_status))
        .route("/api/upload/chunk/{file_id}", delete(uploads::cleanup))
        .route("/api/files/{name}", get(files::download))
        .route("/api/health", get(files::health));

    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
