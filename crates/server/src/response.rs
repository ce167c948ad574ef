//! Uniform response envelope.
//!
//! Every control-plane response is wrapped as
//! `{success, message, data, timestamp}`, with `timestamp` in Unix
//! milliseconds. Failures carry `success: false` and a null `data`.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;

/// Response envelope for all control-plane operations.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
    /// Operation payload, null on failure.
    pub data: Option<T>,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a successful payload.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
            data: Some(data),
            timestamp: now_millis(),
        }
    }

    /// Wrap a failure message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            timestamp: now_millis(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
