//! Prometheus metrics for the Stitch server.
//!
//! Exposes metrics for chunk ingestion, merges, and session reclamation.
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping
//! and MUST be network-restricted to authorized scraper IPs at the
//! infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static CHUNKS_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "stitch_chunks_uploaded_total",
        "Total number of chunks ingested",
    )
    .expect("metric creation failed")
});

pub static BYTES_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("stitch_bytes_uploaded_total", "Total chunk bytes ingested")
        .expect("metric creation failed")
});

pub static MERGES_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "stitch_merges_completed_total",
        "Total number of successful merges",
    )
    .expect("metric creation failed")
});

pub static MERGES_REJECTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "stitch_merges_rejected_total",
        "Total number of merges rejected for missing chunks",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_CLEANED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "stitch_sessions_cleaned_total",
        "Total number of sessions removed by explicit cleanup or merge",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_SWEPT: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "stitch_sessions_swept_total",
        "Total number of expired sessions removed by the background sweep",
    )
    .expect("metric creation failed")
});

pub static CHUNK_UPLOAD_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(HistogramOpts::new(
        "stitch_chunk_upload_duration_seconds",
        "Time to ingest one chunk",
    ))
    .expect("metric creation failed")
});

pub static MERGE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(HistogramOpts::new(
        "stitch_merge_duration_seconds",
        "Time to merge a complete session",
    ))
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Idempotent.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(CHUNKS_UPLOADED.clone()),
            Box::new(BYTES_UPLOADED.clone()),
            Box::new(MERGES_COMPLETED.clone()),
            Box::new(MERGES_REJECTED.clone()),
            Box::new(SESSIONS_CLEANED.clone()),
            Box::new(SESSIONS_SWEPT.clone()),
            Box::new(CHUNK_UPLOAD_DURATION.clone()),
            Box::new(MERGE_DURATION.clone()),
        ];
        for metric in metrics {
            REGISTRY
                .register(metric)
                .expect("metric registration failed");
        }
    });
}

/// GET /metrics - Prometheus exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "Metrics output was not valid UTF-8");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}
